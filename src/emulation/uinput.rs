//! Linux virtual pad on top of `/dev/uinput`.
//!
//! The device announces itself with the Xbox 360 pad identity so games and SDL pick the
//! usual mapping. Updates are buffered and written in one batch on commit; `emit` closes
//! the batch with a `SYN_REPORT`.

use super::{PadAxis, PadButton, PadProvider, PadTrigger, SinkError, VirtualPad};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

const DEVICE_NAME: &str = "Microsoft X-Box 360 pad";
const XBOX360_VENDOR_ID: u16 = 0x045e;
const XBOX360_PRODUCT_ID: u16 = 0x028e;
const XBOX360_VERSION: u16 = 0x0110;

const STICK_FUZZ: i32 = 16;
const STICK_FLAT: i32 = 128;

pub struct UinputProvider {
    node: PathBuf,
}

impl Default for UinputProvider {
    fn default() -> Self {
        Self {
            node: PathBuf::from("/dev/uinput"),
        }
    }
}

impl PadProvider for UinputProvider {
    /// The node has to exist and be writable by this user.
    fn is_available(&self) -> bool {
        match OpenOptions::new().write(true).open(&self.node) {
            Ok(_) => true,
            Err(e) => {
                debug!("{} not usable: {}", self.node.display(), e);
                false
            }
        }
    }

    fn create(&self) -> Result<Box<dyn VirtualPad>, SinkError> {
        let device = build_device().map_err(|e| SinkError::Rejected(e.to_string()))?;
        info!("Created uinput device \"{}\"", DEVICE_NAME);
        Ok(Box::new(UinputPad {
            device,
            pending: Vec::new(),
        }))
    }
}

fn build_device() -> io::Result<VirtualDevice> {
    let mut keys = AttributeSet::<Key>::new();
    for button in PadButton::ALL {
        keys.insert(key_for(button));
    }

    let stick = AbsInfo::new(0, -32768, 32767, STICK_FUZZ, STICK_FLAT, 0);
    let trigger = AbsInfo::new(0, 0, 255, 0, 0, 0);

    let mut builder = VirtualDeviceBuilder::new()?
        .name(DEVICE_NAME)
        .input_id(InputId::new(
            BusType::BUS_USB,
            XBOX360_VENDOR_ID,
            XBOX360_PRODUCT_ID,
            XBOX360_VERSION,
        ))
        .with_keys(&keys)?;

    for axis in PadAxis::ALL {
        builder = builder.with_absolute_axis(&UinputAbsSetup::new(axis_for(axis), stick))?;
    }
    for side in [PadTrigger::Left, PadTrigger::Right] {
        builder = builder.with_absolute_axis(&UinputAbsSetup::new(trigger_for(side), trigger))?;
    }

    builder.build()
}

fn key_for(button: PadButton) -> Key {
    match button {
        PadButton::A => Key::BTN_SOUTH,
        PadButton::B => Key::BTN_EAST,
        PadButton::X => Key::BTN_NORTH,
        PadButton::Y => Key::BTN_WEST,
        PadButton::LeftShoulder => Key::BTN_TL,
        PadButton::RightShoulder => Key::BTN_TR,
        PadButton::Start => Key::BTN_START,
        PadButton::Back => Key::BTN_SELECT,
        PadButton::Guide => Key::BTN_MODE,
        PadButton::DpadUp => Key::BTN_DPAD_UP,
        PadButton::DpadDown => Key::BTN_DPAD_DOWN,
        PadButton::DpadLeft => Key::BTN_DPAD_LEFT,
        PadButton::DpadRight => Key::BTN_DPAD_RIGHT,
    }
}

fn axis_for(axis: PadAxis) -> AbsoluteAxisType {
    match axis {
        PadAxis::LeftX => AbsoluteAxisType::ABS_X,
        PadAxis::LeftY => AbsoluteAxisType::ABS_Y,
        PadAxis::RightX => AbsoluteAxisType::ABS_RX,
        PadAxis::RightY => AbsoluteAxisType::ABS_RY,
    }
}

fn trigger_for(trigger: PadTrigger) -> AbsoluteAxisType {
    match trigger {
        PadTrigger::Left => AbsoluteAxisType::ABS_Z,
        PadTrigger::Right => AbsoluteAxisType::ABS_RZ,
    }
}

/// evdev reports Y growing downwards.
fn evdev_axis_value(axis: PadAxis, value: i16) -> i32 {
    match axis {
        PadAxis::LeftY | PadAxis::RightY => -(value as i32),
        PadAxis::LeftX | PadAxis::RightX => value as i32,
    }
}

struct UinputPad {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl UinputPad {
    fn queue(&mut self, kind: EventType, code: u16, value: i32) -> Result<(), SinkError> {
        self.pending.push(InputEvent::new(kind, code, value));
        Ok(())
    }
}

impl VirtualPad for UinputPad {
    fn set_axis(&mut self, axis: PadAxis, value: i16) -> Result<(), SinkError> {
        let code = axis_for(axis).0;
        self.queue(EventType::ABSOLUTE, code, evdev_axis_value(axis, value))
    }

    fn set_trigger(&mut self, trigger: PadTrigger, value: u8) -> Result<(), SinkError> {
        let code = trigger_for(trigger).0;
        self.queue(EventType::ABSOLUTE, code, value as i32)
    }

    fn press_button(&mut self, button: PadButton) -> Result<(), SinkError> {
        self.queue(EventType::KEY, key_for(button).code(), 1)
    }

    fn release_button(&mut self, button: PadButton) -> Result<(), SinkError> {
        self.queue(EventType::KEY, key_for(button).code(), 0)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        let result = self
            .device
            .emit(&self.pending)
            .map_err(|e| SinkError::Io(e.to_string()));
        self.pending.clear();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn y_axes_are_flipped_for_evdev() {
        assert_eq!(evdev_axis_value(PadAxis::LeftY, 32767), -32767);
        assert_eq!(evdev_axis_value(PadAxis::RightY, -32767), 32767);
        assert_eq!(evdev_axis_value(PadAxis::LeftX, 1200), 1200);
    }

    #[test]
    fn every_button_has_a_distinct_key() {
        let mut codes: Vec<u16> = PadButton::ALL.iter().map(|b| key_for(*b).code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), PadButton::ALL.len());
    }

    #[test]
    fn missing_node_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = UinputProvider {
            node: dir.path().join("uinput"),
        };
        assert!(!provider.is_available());
    }
}
