//! Device session: connection handshake and the background read loop.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──► Connecting ──► Connected ──► Reading ──► Disconnecting ──► Idle
//!              │                                      ▲
//!              └──► Failed(reason)     stop request ──┤
//!                                      read error  ───┘
//! ```
//!
//! The connection phases are a statum typestate machine: only a
//! `DeviceSession<Reading>` has a read loop, and only `connect` produces one. The runtime
//! view of the lifecycle ([`SessionState`]) is published on a watch channel so the UI can
//! show it without touching the reader thread.
//!
//! # Threading
//!
//! [`SessionHandle::spawn`] moves the session onto a dedicated thread. The thread owns the
//! device handle for its whole life and closes it exactly once on the way out, whatever
//! made the loop stop. Stopping is cooperative: [`SessionHandle::stop`] raises a flag that
//! the loop checks before every read, then waits a bounded time for the thread to finish.

use crate::config::{BridgeSettings, DeviceIds};
use crate::controller::report::{self, InputFrame};
use crate::controller::transport::{
    bring_up, BringUpError, HidTransport, ReportSource, UsbBus, REPORT_BUFFER_LEN,
};
use chrono::Local;
use statum::{machine, state};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Why a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    DeviceNotFound,
    HandshakeFailed,
    OpenFailed,
}

/// Observable lifecycle of the device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Reading,
    Disconnecting,
    Failed(ConnectFailure),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Connected => write!(f, "Connected"),
            SessionState::Reading => write!(f, "Reading"),
            SessionState::Disconnecting => write!(f, "Disconnecting"),
            SessionState::Failed(reason) => write!(f, "Failed ({:?})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Device handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    #[error("Read error: {0}")]
    ReadError(String),

    #[error("Reader thread did not stop within {0:?}")]
    StopTimeout(Duration),

    #[error("Previous reader thread is still running")]
    PreviousSessionRunning,

    #[error("Failed to spawn reader thread: {0}")]
    ThreadSpawn(String),
}

/// How the read loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The stop flag was raised.
    Stopped,
    /// The device failed mid-session; the handle has been closed.
    ReadFailed(SessionError),
}

/// Receives everything the reader thread produces, on the reader thread.
pub trait FrameSink: Send {
    fn on_frame(&mut self, frame: InputFrame);

    fn on_session_end(&mut self, _end: SessionEnd) {}
}

/// Shared, observable [`SessionState`].
#[derive(Clone, Debug)]
pub struct StateCell(Arc<watch::Sender<SessionState>>);

impl StateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Idle);
        Self(Arc::new(tx))
    }

    pub fn set(&self, state: SessionState) {
        let previous = self.0.send_replace(state);
        if previous != state {
            debug!("Session state: {} -> {}", previous, state);
        }
    }

    pub fn get(&self) -> SessionState {
        *self.0.borrow()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Read loop tunables.
#[derive(Debug, Clone, Copy)]
pub struct ReadLoopSettings {
    pub read_timeout: Duration,
    pub stop_timeout: Duration,
    pub stats_interval: chrono::Duration,
}

impl From<&BridgeSettings> for ReadLoopSettings {
    fn from(settings: &BridgeSettings) -> Self {
        Self {
            read_timeout: settings.read_timeout(),
            stop_timeout: settings.stop_timeout(),
            stats_interval: chrono::Duration::seconds(settings.stats_interval_secs.max(1)),
        }
    }
}

/// Owns the open report source and closes it exactly once.
pub struct DeviceGuard {
    source: Option<Box<dyn ReportSource>>,
}

impl DeviceGuard {
    fn empty() -> Self {
        Self { source: None }
    }

    fn attach(&mut self, source: Box<dyn ReportSource>) {
        self.close();
        self.source = Some(source);
    }

    /// Best effort: a failing close is logged, never returned.
    fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            match source.close() {
                Ok(()) => info!("Device handle closed"),
                Err(e) => warn!("Closing device handle failed: {}", e),
            }
        }
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.close();
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionPhase {
    Connecting,
    Reading,
}

#[machine]
pub struct DeviceSession<S: SessionPhase> {
    ids: DeviceIds,
    settings: ReadLoopSettings,
    device: DeviceGuard,
    state: StateCell,
}

impl DeviceSession<Connecting> {
    pub fn create(ids: DeviceIds, settings: ReadLoopSettings, state: StateCell) -> Self {
        Self::new(ids, settings, DeviceGuard::empty(), state)
    }

    /// Runs the USB handshake, opens the HID stream and moves to `Reading`.
    ///
    /// Failures leave the state at `Failed(reason)` and no handle open.
    pub fn connect(
        mut self,
        bus: &dyn UsbBus,
        hid: &dyn HidTransport,
    ) -> Result<DeviceSession<Reading>, SessionError> {
        self.state.set(SessionState::Connecting);
        info!(
            "Connecting to {:04x}:{:04x}",
            self.ids.vendor_id, self.ids.product_id
        );

        if let Err(e) = bring_up(bus, self.ids) {
            let (reason, err) = match e {
                BringUpError::NotFound => {
                    (ConnectFailure::DeviceNotFound, SessionError::DeviceNotFound)
                }
                BringUpError::WriteFailed(usb) => (
                    ConnectFailure::HandshakeFailed,
                    SessionError::HandshakeFailed(usb.to_string()),
                ),
            };
            error!("Bring-up failed: {}", err);
            self.state.set(SessionState::Failed(reason));
            return Err(err);
        }

        match hid.open(self.ids) {
            Ok(source) => self.device.attach(source),
            Err(e) => {
                error!("HID open failed: {}", e);
                self.state
                    .set(SessionState::Failed(ConnectFailure::OpenFailed));
                return Err(SessionError::OpenFailed(e.to_string()));
            }
        }

        self.state.set(SessionState::Connected);
        // no armed phase: an open handle starts reading right away
        self.state.set(SessionState::Reading);
        Ok(self.transition())
    }
}

impl DeviceSession<Reading> {
    /// Reads until `stop` is raised or the device fails.
    ///
    /// Every iteration issues one read bounded by the read timeout, so a stop request is
    /// seen within one timeout interval. Malformed reports are dropped and counted.
    pub fn run_read_loop(&mut self, stop: &AtomicBool, sink: &mut dyn FrameSink) -> SessionEnd {
        let timeout = self.settings.read_timeout;
        let mut stats = ReadStats::new(self.settings.stats_interval);
        let mut buf = [0u8; REPORT_BUFFER_LEN];

        let Some(source) = self.device.source.as_mut() else {
            error!("Read loop started without an open device");
            return SessionEnd::ReadFailed(SessionError::ReadError(
                "no open device".to_string(),
            ));
        };

        info!("Starting read loop (timeout {:?})", timeout);
        while !stop.load(Ordering::Acquire) {
            match source.read(&mut buf, timeout) {
                Ok(0) => stats.timeouts += 1,
                Ok(len) => match report::decode(&buf[..len.min(buf.len())]) {
                    Ok(frame) => {
                        stats.frames += 1;
                        sink.on_frame(frame);
                    }
                    Err(e) => {
                        stats.malformed += 1;
                        debug!("Dropping report: {}", e);
                    }
                },
                Err(e) => {
                    error!("Device read failed: {}", e);
                    stats.log();
                    return SessionEnd::ReadFailed(SessionError::ReadError(e.to_string()));
                }
            }
            stats.maybe_log();
        }

        info!("Stop requested, leaving read loop");
        stats.log();
        SessionEnd::Stopped
    }

    /// Moves through `Disconnecting` to `Idle`, closing the device handle.
    pub fn close(mut self) {
        self.state.set(SessionState::Disconnecting);
        self.device.close();
        self.state.set(SessionState::Idle);
    }
}

/// Throughput counters logged on an interval.
struct ReadStats {
    frames: u64,
    malformed: u64,
    timeouts: u64,
    interval: chrono::Duration,
    last_log_time: chrono::DateTime<Local>,
}

impl ReadStats {
    fn new(interval: chrono::Duration) -> Self {
        Self {
            frames: 0,
            malformed: 0,
            timeouts: 0,
            interval,
            last_log_time: Local::now(),
        }
    }

    fn maybe_log(&mut self) {
        if Local::now() - self.last_log_time > self.interval {
            self.log();
        }
    }

    fn log(&mut self) {
        let elapsed = (Local::now() - self.last_log_time).num_milliseconds().max(1) as f64;
        info!(
            "Read loop stats: {} frames, {} malformed, {} timeouts in {:.1}s (avg {:.1} frames/sec)",
            self.frames,
            self.malformed,
            self.timeouts,
            elapsed / 1000.0,
            self.frames as f64 * 1000.0 / elapsed
        );
        self.frames = 0;
        self.malformed = 0;
        self.timeouts = 0;
        self.last_log_time = Local::now();
    }
}

/// Owner-side handle of a running reader thread.
pub struct SessionHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    state: StateCell,
    stop_timeout: Duration,
}

impl SessionHandle {
    /// Moves the session onto its reader thread.
    pub fn spawn(
        mut session: DeviceSession<Reading>,
        mut sink: Box<dyn FrameSink>,
    ) -> Result<Self, SessionError> {
        let stop = Arc::new(AtomicBool::new(false));
        let state = session.state.clone();
        let stop_timeout = session.settings.stop_timeout;

        let thread_stop = stop.clone();
        let spawned = thread::Builder::new()
            .name("gc-reader".to_string())
            .spawn(move || {
                let end = session.run_read_loop(&thread_stop, sink.as_mut());
                session.close();
                sink.on_session_end(end);
            });

        match spawned {
            Ok(thread) => {
                debug!("Reader thread spawned");
                Ok(Self {
                    stop,
                    thread: Some(thread),
                    state,
                    stop_timeout,
                })
            }
            Err(e) => {
                // the closure, and with it the device handle, is already dropped
                error!("Failed to spawn reader thread: {}", e);
                state.set(SessionState::Idle);
                Err(SessionError::ThreadSpawn(e.to_string()))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Requests a stop and waits up to the stop timeout for the thread to exit.
    ///
    /// A thread that does not exit in time is reported as [`SessionError::StopTimeout`]. It
    /// keeps ownership of the device handle and closes it once it leaves the loop; the
    /// handle stays joinable, so a later `stop` or [`is_running`](Self::is_running) still
    /// tracks it.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        self.stop.store(true, Ordering::Release);

        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        let deadline = Instant::now() + self.stop_timeout;
        while !thread.is_finished() {
            if Instant::now() >= deadline {
                error!(
                    "Reader thread ignored stop request for {:?}",
                    self.stop_timeout
                );
                self.thread = Some(thread);
                return Err(SessionError::StopTimeout(self.stop_timeout));
            }
            thread::sleep(Duration::from_millis(1));
        }

        if thread.join().is_err() {
            error!("Reader thread panicked");
            self.state.set(SessionState::Idle);
        }
        info!("Reader thread stopped");
        Ok(())
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            if let Err(e) = self.stop() {
                error!("Stopping reader thread on drop failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::controller::transport::{HidError, UsbError, UsbLink};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    pub(crate) fn valid_report(byte3: u8) -> Vec<u8> {
        let mut report = vec![0u8; 64];
        report[3] = byte3;
        for offset in [6, 9] {
            report[offset + 1] = 0x08;
            report[offset + 2] = 0x80;
        }
        report
    }

    #[derive(Debug, Clone)]
    pub(crate) enum Step {
        Timeout,
        Report(Vec<u8>),
        Fail,
        /// Blocks for longer than the caller asked, like a wedged driver.
        Stall(Duration),
    }

    #[derive(Default)]
    pub(crate) struct SourceProbe {
        pub reads: AtomicUsize,
        pub closes: AtomicUsize,
    }

    /// Plays back `steps`, then keeps timing out like an idle device.
    pub(crate) struct ScriptedSource {
        steps: VecDeque<Step>,
        probe: Arc<SourceProbe>,
    }

    impl ScriptedSource {
        pub(crate) fn new(steps: Vec<Step>) -> (Self, Arc<SourceProbe>) {
            let probe = Arc::new(SourceProbe::default());
            (
                Self {
                    steps: steps.into(),
                    probe: probe.clone(),
                },
                probe,
            )
        }
    }

    impl ReportSource for ScriptedSource {
        fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, HidError> {
            self.probe.reads.fetch_add(1, Ordering::SeqCst);
            match self.steps.pop_front().unwrap_or(Step::Timeout) {
                Step::Timeout => {
                    thread::sleep(timeout);
                    Ok(0)
                }
                Step::Report(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Step::Fail => Err(HidError::Read("device unplugged".into())),
                Step::Stall(duration) => {
                    thread::sleep(duration);
                    Ok(0)
                }
            }
        }

        fn close(&mut self) -> Result<(), HidError> {
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
            Err(HidError::Close("close failures are swallowed".into()))
        }
    }

    /// Hands out one scripted source per `open`, in order.
    pub(crate) struct FakeHid(pub Mutex<VecDeque<ScriptedSource>>);

    impl FakeHid {
        pub(crate) fn new(sources: Vec<ScriptedSource>) -> Self {
            Self(Mutex::new(sources.into()))
        }
    }

    impl HidTransport for FakeHid {
        fn open(&self, _ids: DeviceIds) -> Result<Box<dyn ReportSource>, HidError> {
            match self.0.lock().unwrap().pop_front() {
                Some(source) => Ok(Box::new(source)),
                None => Err(HidError::Open("no such device".into())),
            }
        }
    }

    pub(crate) struct FakeBus {
        pub present: bool,
        pub fail_write: bool,
    }

    struct FakeLink {
        fail_write: bool,
    }

    impl UsbBus for FakeBus {
        fn find(&self, _ids: DeviceIds) -> Option<Box<dyn UsbLink>> {
            self.present.then(|| {
                Box::new(FakeLink {
                    fail_write: self.fail_write,
                }) as Box<dyn UsbLink>
            })
        }
    }

    impl UsbLink for FakeLink {
        fn set_configuration(&mut self) -> Result<(), UsbError> {
            Ok(())
        }

        fn claim_interface(&mut self, _interface: u8) -> Result<(), UsbError> {
            Err(UsbError::Busy("already claimed".into()))
        }

        fn write(&mut self, _endpoint: u8, data: &[u8], _timeout: Duration) -> Result<usize, UsbError> {
            if self.fail_write {
                Err(UsbError::Transfer("timeout".into()))
            } else {
                Ok(data.len())
            }
        }

        fn release_interface(&mut self, _interface: u8) -> Result<(), UsbError> {
            Ok(())
        }
    }

    pub(crate) fn present_bus() -> FakeBus {
        FakeBus {
            present: true,
            fail_write: false,
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub frames: Arc<Mutex<Vec<InputFrame>>>,
        pub ends: Arc<Mutex<Vec<SessionEnd>>>,
    }

    impl FrameSink for RecordingSink {
        fn on_frame(&mut self, frame: InputFrame) {
            self.frames.lock().unwrap().push(frame);
        }

        fn on_session_end(&mut self, end: SessionEnd) {
            self.ends.lock().unwrap().push(end);
        }
    }

    pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    fn settings() -> ReadLoopSettings {
        ReadLoopSettings {
            read_timeout: Duration::from_millis(10),
            stop_timeout: Duration::from_secs(1),
            stats_interval: chrono::Duration::seconds(10),
        }
    }

    fn connect(steps: Vec<Step>) -> (DeviceSession<Reading>, Arc<SourceProbe>, StateCell) {
        connect_with(settings(), steps)
    }

    fn connect_with(
        settings: ReadLoopSettings,
        steps: Vec<Step>,
    ) -> (DeviceSession<Reading>, Arc<SourceProbe>, StateCell) {
        let (source, probe) = ScriptedSource::new(steps);
        let state = StateCell::new();
        let hid = FakeHid::new(vec![source]);
        let session = DeviceSession::create(DeviceIds::default(), settings, state.clone())
            .connect(&present_bus(), &hid)
            .unwrap();
        (session, probe, state)
    }

    #[test]
    fn connect_reaches_reading() {
        let (_session, _probe, state) = connect(vec![]);
        assert_eq!(state.get(), SessionState::Reading);
    }

    #[test]
    fn missing_device_fails_connect() {
        let state = StateCell::new();
        let hid = FakeHid::new(vec![]);
        let bus = FakeBus {
            present: false,
            fail_write: false,
        };
        let result =
            DeviceSession::create(DeviceIds::default(), settings(), state.clone()).connect(&bus, &hid);
        assert_eq!(result.err(), Some(SessionError::DeviceNotFound));
        assert_eq!(
            state.get(),
            SessionState::Failed(ConnectFailure::DeviceNotFound)
        );
    }

    #[test]
    fn failed_handshake_fails_connect() {
        let state = StateCell::new();
        let hid = FakeHid::new(vec![]);
        let bus = FakeBus {
            present: true,
            fail_write: true,
        };
        let result =
            DeviceSession::create(DeviceIds::default(), settings(), state.clone()).connect(&bus, &hid);
        assert!(matches!(result.err(), Some(SessionError::HandshakeFailed(_))));
        assert_eq!(
            state.get(),
            SessionState::Failed(ConnectFailure::HandshakeFailed)
        );
    }

    #[test]
    fn hid_open_failure_fails_connect() {
        let state = StateCell::new();
        let hid = FakeHid::new(vec![]);
        let result = DeviceSession::create(DeviceIds::default(), settings(), state.clone())
            .connect(&present_bus(), &hid);
        assert!(matches!(result.err(), Some(SessionError::OpenFailed(_))));
        assert_eq!(state.get(), SessionState::Failed(ConnectFailure::OpenFailed));
    }

    #[test]
    fn timeouts_publish_nothing_and_keep_running() {
        let (session, probe, state) = connect(vec![Step::Timeout, Step::Timeout, Step::Timeout]);
        let sink = RecordingSink::default();
        let mut handle = SessionHandle::spawn(session, Box::new(sink.clone())).unwrap();

        assert!(wait_until(|| probe.reads.load(Ordering::SeqCst) > 3));
        assert!(sink.frames.lock().unwrap().is_empty());
        assert!(handle.is_running());
        assert_eq!(state.get(), SessionState::Reading);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 0);

        handle.stop().unwrap();
    }

    #[test]
    fn stop_mid_read_closes_handle_once() {
        let (session, probe, state) = connect(vec![]);
        let sink = RecordingSink::default();
        let mut handle = SessionHandle::spawn(session, Box::new(sink.clone())).unwrap();
        assert!(wait_until(|| probe.reads.load(Ordering::SeqCst) > 0));

        let started = Instant::now();
        handle.stop().unwrap();
        // one 10ms read in flight plus scheduling slack
        assert!(started.elapsed() < Duration::from_millis(500));

        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert_eq!(state.get(), SessionState::Idle);
        assert_eq!(*sink.ends.lock().unwrap(), vec![SessionEnd::Stopped]);

        drop(handle);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn frames_arrive_in_order_and_malformed_reports_are_dropped() {
        let (session, probe, _state) = connect(vec![
            Step::Report(valid_report(0x01)),
            Step::Report(vec![0u8; 8]),
            Step::Report(valid_report(0x02)),
        ]);
        let sink = RecordingSink::default();
        let mut handle = SessionHandle::spawn(session, Box::new(sink.clone())).unwrap();

        assert!(wait_until(|| probe.reads.load(Ordering::SeqCst) > 3));
        handle.stop().unwrap();

        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].buttons.contains(crate::controller::report::Button::B));
        assert!(frames[1].buttons.contains(crate::controller::report::Button::A));
    }

    #[test]
    fn read_error_ends_session_and_closes_handle() {
        let (session, probe, state) = connect(vec![Step::Report(valid_report(0x01)), Step::Fail]);
        let sink = RecordingSink::default();
        let mut handle = SessionHandle::spawn(session, Box::new(sink.clone())).unwrap();

        assert!(wait_until(|| !sink.ends.lock().unwrap().is_empty()));
        assert!(wait_until(|| !handle.is_running()));
        assert_eq!(sink.frames.lock().unwrap().len(), 1);
        assert!(matches!(
            sink.ends.lock().unwrap()[0],
            SessionEnd::ReadFailed(SessionError::ReadError(_))
        ));
        assert_eq!(state.get(), SessionState::Idle);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);

        handle.stop().unwrap();
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stalled_read_reports_stop_timeout_and_closes_handle_once_it_returns() {
        let settings = ReadLoopSettings {
            stop_timeout: Duration::from_millis(20),
            ..settings()
        };
        let (session, probe, state) =
            connect_with(settings, vec![Step::Stall(Duration::from_millis(300))]);
        let sink = RecordingSink::default();
        let mut handle = SessionHandle::spawn(session, Box::new(sink.clone())).unwrap();
        assert!(wait_until(|| probe.reads.load(Ordering::SeqCst) > 0));

        assert_eq!(
            handle.stop(),
            Err(SessionError::StopTimeout(Duration::from_millis(20)))
        );
        assert!(handle.is_running());
        assert_eq!(probe.closes.load(Ordering::SeqCst), 0);
        assert_eq!(state.get(), SessionState::Reading);

        assert!(wait_until(|| !handle.is_running()));
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert_eq!(state.get(), SessionState::Idle);
        assert_eq!(*sink.ends.lock().unwrap(), vec![SessionEnd::Stopped]);

        handle.stop().unwrap();
        drop(handle);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
    }
}
