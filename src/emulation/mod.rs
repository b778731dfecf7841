//! Emulation bridge: mirrors decoded frames onto a virtual Xbox 360 style pad.
//!
//! The bridge owns at most one sink handle. While active, every frame is written as a
//! complete snapshot (all buttons, both sticks, both triggers) followed by exactly one
//! commit, so the sink never sees a half-updated state and nothing carries over between
//! frames.

#[cfg(target_os = "linux")]
pub mod uinput;

use crate::calibration::{CalibrationProfile, EmulationMode, TriggerSide};
use crate::controller::report::{Button, DpadDirection, InputFrame};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Buttons of the virtual pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadButton {
    A,
    B,
    X,
    Y,
    LeftShoulder,
    RightShoulder,
    Start,
    Back,
    Guide,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
}

impl PadButton {
    pub const ALL: [PadButton; 13] = [
        PadButton::A,
        PadButton::B,
        PadButton::X,
        PadButton::Y,
        PadButton::LeftShoulder,
        PadButton::RightShoulder,
        PadButton::Start,
        PadButton::Back,
        PadButton::Guide,
        PadButton::DpadUp,
        PadButton::DpadDown,
        PadButton::DpadLeft,
        PadButton::DpadRight,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

impl PadAxis {
    pub const ALL: [PadAxis; 4] = [
        PadAxis::LeftX,
        PadAxis::LeftY,
        PadAxis::RightX,
        PadAxis::RightY,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadTrigger {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("Virtual pad rejected update: {0}")]
    Rejected(String),

    #[error("Virtual pad I/O error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmulationError {
    #[error("Virtual controller driver is not available")]
    SinkUnavailable,

    #[error("Failed to create virtual controller: {0}")]
    SinkCreationFailed(String),

    #[error("Controller is not connected")]
    NotReading,

    #[error("Failed to update virtual controller: {0}")]
    PushFailed(String),
}

/// One created virtual pad. Dropping it destroys the device.
///
/// Axis values use the XInput convention: positive Y is up.
pub trait VirtualPad: Send {
    fn set_axis(&mut self, axis: PadAxis, value: i16) -> Result<(), SinkError>;
    fn set_trigger(&mut self, trigger: PadTrigger, value: u8) -> Result<(), SinkError>;
    fn press_button(&mut self, button: PadButton) -> Result<(), SinkError>;
    fn release_button(&mut self, button: PadButton) -> Result<(), SinkError>;
    /// Makes everything set since the previous commit visible to the host.
    fn commit(&mut self) -> Result<(), SinkError>;
}

/// Creates virtual pads on the host.
pub trait PadProvider: Send {
    fn is_available(&self) -> bool;
    fn create(&self) -> Result<Box<dyn VirtualPad>, SinkError>;
}

/// Provider for hosts without a supported virtual controller driver.
pub struct UnsupportedProvider;

impl PadProvider for UnsupportedProvider {
    fn is_available(&self) -> bool {
        false
    }

    fn create(&self) -> Result<Box<dyn VirtualPad>, SinkError> {
        Err(SinkError::Rejected(
            "no virtual controller driver on this platform".to_string(),
        ))
    }
}

/// The host's virtual pad provider.
pub fn default_provider() -> Box<dyn PadProvider> {
    #[cfg(target_os = "linux")]
    {
        Box::new(uinput::UinputProvider::default())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(UnsupportedProvider)
    }
}

/// Sink button for a controller button. L and R drive the triggers instead, GR and GL have
/// no counterpart.
pub fn map_button(button: Button) -> Option<PadButton> {
    match button {
        Button::A => Some(PadButton::A),
        Button::B => Some(PadButton::B),
        Button::X => Some(PadButton::X),
        Button::Y => Some(PadButton::Y),
        Button::Z => Some(PadButton::RightShoulder),
        Button::ZL => Some(PadButton::LeftShoulder),
        Button::StartPause => Some(PadButton::Start),
        Button::Home => Some(PadButton::Guide),
        Button::Capture | Button::Chat => Some(PadButton::Back),
        Button::L | Button::R | Button::GR | Button::GL => None,
    }
}

pub fn map_dpad(direction: DpadDirection) -> PadButton {
    match direction {
        DpadDirection::Up => PadButton::DpadUp,
        DpadDirection::Down => PadButton::DpadDown,
        DpadDirection::Left => PadButton::DpadLeft,
        DpadDirection::Right => PadButton::DpadRight,
    }
}

/// Whether any input of `frame` maps onto `target`.
pub fn is_pressed(frame: &InputFrame, target: PadButton) -> bool {
    frame
        .buttons
        .iter()
        .any(|button| map_button(button) == Some(target))
        || frame.dpad.iter().any(|direction| map_dpad(direction) == target)
}

/// `[-1, 1]` stick value to the signed 16-bit sink range.
pub fn scale_stick(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Trigger output: a digital L/R press forces full scale.
pub fn trigger_value(frame: &InputFrame, profile: &CalibrationProfile, side: TriggerSide) -> u8 {
    let (digital, raw) = match side {
        TriggerSide::Left => (Button::L, frame.left_trigger_raw),
        TriggerSide::Right => (Button::R, frame.right_trigger_raw),
    };
    if frame.buttons.contains(digital) {
        u8::MAX
    } else {
        profile.calibrate(side, raw)
    }
}

pub struct EmulationBridge {
    provider: Box<dyn PadProvider>,
    pad: Option<Box<dyn VirtualPad>>,
    push_failures: u64,
}

impl fmt::Debug for EmulationBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulationBridge")
            .field("active", &self.is_active())
            .field("push_failures", &self.push_failures)
            .finish()
    }
}

impl EmulationBridge {
    pub fn new(provider: Box<dyn PadProvider>) -> Self {
        Self {
            provider,
            pad: None,
            push_failures: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.pad.is_some()
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    #[cfg(test)]
    pub(crate) fn push_failures(&self) -> u64 {
        self.push_failures
    }

    /// Creates the virtual pad. Activating an active bridge does nothing.
    pub fn activate(&mut self, mode: EmulationMode) -> Result<(), EmulationError> {
        if self.is_active() {
            debug!("Emulation already active");
            return Ok(());
        }

        if mode == EmulationMode::DualShock {
            warn!("DualShock emulation is not supported, using Xbox 360");
        }

        if !self.provider.is_available() {
            error!("Virtual controller driver is not available");
            return Err(EmulationError::SinkUnavailable);
        }

        let pad = self.provider.create().map_err(|e| {
            error!("Virtual controller creation failed: {}", e);
            EmulationError::SinkCreationFailed(e.to_string())
        })?;

        self.pad = Some(pad);
        info!("Xbox 360 emulation started");
        Ok(())
    }

    /// Resets the pad to neutral and releases it. Never fails; each step is attempted
    /// regardless of earlier failures.
    pub fn deactivate(&mut self) {
        let Some(mut pad) = self.pad.take() else {
            return;
        };

        let mut failures = 0usize;
        let mut step = |result: Result<(), SinkError>| {
            if let Err(e) = result {
                debug!("Neutral reset step failed: {}", e);
                failures += 1;
            }
        };

        for button in PadButton::ALL {
            step(pad.release_button(button));
        }
        for axis in PadAxis::ALL {
            step(pad.set_axis(axis, 0));
        }
        step(pad.set_trigger(PadTrigger::Left, 0));
        step(pad.set_trigger(PadTrigger::Right, 0));
        step(pad.commit());

        if failures > 0 {
            warn!("{} neutral reset steps failed", failures);
        }

        drop(pad);
        info!("Emulation stopped");
    }

    /// Mirrors one frame onto the pad. Failures are logged and counted, never returned.
    pub fn push(&mut self, frame: &InputFrame, profile: &CalibrationProfile) {
        let Some(pad) = self.pad.as_mut() else {
            return;
        };

        if let Err(e) = write_frame(pad.as_mut(), frame, profile) {
            self.push_failures += 1;
            let err = EmulationError::PushFailed(e.to_string());
            // a dying sink fails every frame; keep the log readable
            if self.push_failures.is_power_of_two() {
                warn!("{} ({} failures so far)", err, self.push_failures);
            } else {
                debug!("{}", err);
            }
        }
    }
}

impl Drop for EmulationBridge {
    fn drop(&mut self) {
        self.deactivate();
    }
}

fn write_frame(
    pad: &mut dyn VirtualPad,
    frame: &InputFrame,
    profile: &CalibrationProfile,
) -> Result<(), SinkError> {
    for button in PadButton::ALL {
        if is_pressed(frame, button) {
            pad.press_button(button)?;
        } else {
            pad.release_button(button)?;
        }
    }

    pad.set_trigger(
        PadTrigger::Left,
        trigger_value(frame, profile, TriggerSide::Left),
    )?;
    pad.set_trigger(
        PadTrigger::Right,
        trigger_value(frame, profile, TriggerSide::Right),
    )?;

    pad.set_axis(PadAxis::LeftX, scale_stick(frame.left_stick.x))?;
    pad.set_axis(PadAxis::LeftY, scale_stick(frame.left_stick.y))?;
    pad.set_axis(PadAxis::RightX, scale_stick(frame.right_stick.x))?;
    pad.set_axis(PadAxis::RightY, scale_stick(frame.right_stick.y))?;

    pad.commit()
}
