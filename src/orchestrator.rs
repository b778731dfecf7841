//! Wires the device session, the emulation bridge and the presentation layer together.
//!
//! The [`Orchestrator`] lives on the UI thread and handles user intents (connect, emulate,
//! apply calibration). Per-frame work happens on the reader thread inside a
//! [`FrameRouter`]: the bridge push comes first so emulation latency never depends on the
//! UI, then every n-th frame is posted to the presentation layer.

use crate::calibration::CalibrationProfile;
use crate::config::BridgeSettings;
use crate::controller::device_session::{
    DeviceSession, FrameSink, ReadLoopSettings, SessionEnd, SessionError, SessionHandle,
    SessionState, StateCell,
};
use crate::controller::report::InputFrame;
use crate::controller::transport::{HidTransport, HidapiTransport, RusbBus, UsbBus};
use crate::emulation::{default_provider, EmulationBridge, EmulationError, PadProvider};
use crate::persistence::ConfigStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Messages for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Frame(InputFrame),
    Status(String),
    /// The read loop is gone; input indicators should return to rest.
    SessionEnded,
}

/// Fire-and-forget delivery to the UI thread. Must never block the caller.
pub trait Presenter: Send + Sync {
    fn present(&self, update: UiUpdate);
}

/// Host collaborators the orchestrator drives.
pub struct Collaborators {
    pub usb: Box<dyn UsbBus>,
    pub hid: Box<dyn HidTransport>,
    pub pads: Box<dyn PadProvider>,
}

impl Collaborators {
    /// `rusb`, `hidapi` and the platform's virtual pad provider.
    pub fn system() -> Self {
        Self {
            usb: Box::new(RusbBus),
            hid: Box::new(HidapiTransport),
            pads: default_provider(),
        }
    }
}

/// Forwards frame 0, n, 2n, ... for a divisor n.
#[derive(Debug, Clone)]
pub struct PresentationThrottle {
    divisor: u64,
    seen: u64,
}

impl PresentationThrottle {
    pub fn new(divisor: u32) -> Self {
        Self {
            divisor: u64::from(divisor.max(1)),
            seen: 0,
        }
    }

    pub fn should_present(&mut self) -> bool {
        let present = self.seen % self.divisor == 0;
        self.seen = self.seen.wrapping_add(1);
        present
    }
}

fn lock_bridge(bridge: &Mutex<EmulationBridge>) -> MutexGuard<'_, EmulationBridge> {
    bridge.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-frame fan-out, running on the reader thread.
pub struct FrameRouter {
    bridge: Arc<Mutex<EmulationBridge>>,
    profile: watch::Receiver<CalibrationProfile>,
    presenter: Arc<dyn Presenter>,
    throttle: PresentationThrottle,
}

impl FrameRouter {
    pub fn new(
        bridge: Arc<Mutex<EmulationBridge>>,
        profile: watch::Receiver<CalibrationProfile>,
        presenter: Arc<dyn Presenter>,
        presentation_divisor: u32,
    ) -> Self {
        Self {
            bridge,
            profile,
            presenter,
            throttle: PresentationThrottle::new(presentation_divisor),
        }
    }
}

impl FrameSink for FrameRouter {
    fn on_frame(&mut self, frame: InputFrame) {
        {
            let mut bridge = lock_bridge(&self.bridge);
            if bridge.is_active() {
                let profile = *self.profile.borrow();
                bridge.push(&frame, &profile);
            }
        }

        if self.throttle.should_present() {
            self.presenter.present(UiUpdate::Frame(frame));
        }
    }

    fn on_session_end(&mut self, end: SessionEnd) {
        if let SessionEnd::ReadFailed(e) = end {
            lock_bridge(&self.bridge).deactivate();
            self.presenter
                .present(UiUpdate::Status(format!("Controller disconnected: {}", e)));
        }
        self.presenter.present(UiUpdate::SessionEnded);
    }
}

pub struct Orchestrator {
    settings: BridgeSettings,
    store: ConfigStore,
    usb: Box<dyn UsbBus>,
    hid: Box<dyn HidTransport>,
    bridge: Arc<Mutex<EmulationBridge>>,
    profile: watch::Sender<CalibrationProfile>,
    presenter: Arc<dyn Presenter>,
    state: StateCell,
    session: Option<SessionHandle>,
    /// Reader thread that ignored its stop request. Blocks new connects until it exits.
    stalled: Option<SessionHandle>,
    emulation_available: bool,
}

impl Orchestrator {
    pub fn new(
        settings: BridgeSettings,
        store: ConfigStore,
        profile: CalibrationProfile,
        collaborators: Collaborators,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let (profile, _) = watch::channel(profile);
        let emulation_available = collaborators.pads.is_available();
        Self {
            settings,
            store,
            usb: collaborators.usb,
            hid: collaborators.hid,
            bridge: Arc::new(Mutex::new(EmulationBridge::new(collaborators.pads))),
            profile,
            presenter,
            state: StateCell::new(),
            session: None,
            stalled: None,
            emulation_available,
        }
    }

    /// Latest committed calibration snapshot.
    pub fn profile(&self) -> CalibrationProfile {
        *self.profile.borrow()
    }

    pub fn session_state(&self) -> SessionState {
        self.state.get()
    }

    pub fn is_connected(&mut self) -> bool {
        self.reap_finished_session();
        self.reap_stalled_session();
        self.session.is_some()
    }

    pub fn is_emulating(&self) -> bool {
        lock_bridge(&self.bridge).is_active()
    }

    /// Driver availability as of the last connect.
    pub fn emulation_available(&self) -> bool {
        self.emulation_available
    }

    fn status(&self, message: impl Into<String>) {
        self.presenter.present(UiUpdate::Status(message.into()));
    }

    /// Drops the handle of a reader thread that already exited on its own.
    fn reap_finished_session(&mut self) {
        if self.session.as_ref().is_some_and(|s| !s.is_running()) {
            if let Some(mut session) = self.session.take() {
                if let Err(e) = session.stop() {
                    warn!("Reaping finished session: {}", e);
                }
                debug!("Reaped finished reader thread");
            }
        }
    }

    /// Joins a timed-out reader thread once it has exited. Returns whether none is left.
    fn reap_stalled_session(&mut self) -> bool {
        match &self.stalled {
            Some(stalled) if stalled.is_running() => false,
            Some(_) => {
                if let Some(mut stalled) = self.stalled.take() {
                    if let Err(e) = stalled.stop() {
                        warn!("Reaping stalled session: {}", e);
                    }
                    // no reader left to publish the final state
                    self.state.set(SessionState::Idle);
                    info!("Stalled reader thread exited");
                }
                true
            }
            None => true,
        }
    }

    pub fn connect(&mut self) -> Result<(), SessionError> {
        self.reap_finished_session();
        if self.session.is_some() {
            debug!("Already connected");
            return Ok(());
        }
        if !self.reap_stalled_session() {
            let e = SessionError::PreviousSessionRunning;
            warn!("Connect refused: {}", e);
            self.status(e.to_string());
            return Err(e);
        }

        self.status("Connecting...");
        let session = DeviceSession::create(
            self.settings.device,
            ReadLoopSettings::from(&self.settings),
            self.state.clone(),
        );

        let result = session
            .connect(self.usb.as_ref(), self.hid.as_ref())
            .and_then(|session| {
                let router = FrameRouter::new(
                    self.bridge.clone(),
                    self.profile.subscribe(),
                    self.presenter.clone(),
                    self.settings.presentation_divisor,
                );
                SessionHandle::spawn(session, Box::new(router))
            });

        match result {
            Ok(handle) => {
                self.session = Some(handle);
                self.emulation_available = lock_bridge(&self.bridge).is_available();
                info!("Controller connected");
                self.status("Connected");
                Ok(())
            }
            Err(e) => {
                error!("Connect failed: {}", e);
                self.status(e.to_string());
                Err(e)
            }
        }
    }

    /// Stops emulation and the reader thread. Disconnecting while idle does nothing.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        self.stop_emulation();

        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        match session.stop() {
            Ok(()) => {
                info!("Controller disconnected");
                self.status("Disconnected");
                Ok(())
            }
            Err(e) => {
                // the thread still owns the device and will publish Idle when it exits
                error!("Disconnect failed: {}", e);
                self.state.set(SessionState::Disconnecting);
                self.stalled = Some(session);
                self.status(e.to_string());
                Err(e)
            }
        }
    }

    pub fn toggle_connection(&mut self) -> Result<(), SessionError> {
        if self.is_connected() {
            self.disconnect()
        } else {
            self.connect()
        }
    }

    /// Emulation needs a session in `Reading`.
    pub fn start_emulation(&mut self) -> Result<(), EmulationError> {
        if !self.is_connected() || self.session_state() != SessionState::Reading {
            self.status(EmulationError::NotReading.to_string());
            return Err(EmulationError::NotReading);
        }

        let mode = self.profile().emulation_mode;
        let result = lock_bridge(&self.bridge).activate(mode);
        match &result {
            Ok(()) => self.status("Emulating Xbox 360 controller"),
            Err(e) => self.status(e.to_string()),
        }
        result
    }

    pub fn stop_emulation(&mut self) {
        let mut bridge = lock_bridge(&self.bridge);
        if bridge.is_active() {
            bridge.deactivate();
            drop(bridge);
            self.status("Emulation stopped");
        }
    }

    pub fn toggle_emulation(&mut self) -> Result<(), EmulationError> {
        if self.is_emulating() {
            self.stop_emulation();
            Ok(())
        } else {
            self.start_emulation()
        }
    }

    /// Publishes a new snapshot; the reader thread picks it up on its next frame.
    pub fn commit_profile(&self, profile: CalibrationProfile) {
        self.profile.send_replace(profile);
        debug!("Calibration committed: {:?}", profile);
    }

    pub fn save_profile(&self, profile: CalibrationProfile) -> color_eyre::Result<()> {
        self.commit_profile(profile);
        match self.store.save_calibration(&profile) {
            Ok(()) => {
                self.status("Calibration saved");
                Ok(())
            }
            Err(e) => {
                error!("Saving calibration failed: {}", e);
                self.status(format!("Saving calibration failed: {}", e));
                Err(e)
            }
        }
    }

    /// Stops emulation and disconnects. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.disconnect() {
            error!("Shutdown: {}", e);
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
