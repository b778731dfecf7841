//! Report decoder for the controller's fixed 64-byte input report.
//!
//! Pure conversion from raw bytes to an [`InputFrame`]. Nothing here touches a device
//! handle, so the layout can be tested with literal byte arrays.
//!
//! # Layout
//!
//! ```text
//! byte  3      buttons   B A Y X R Z Start/Pause
//! byte  4      buttons   D-Down D-Right D-Left D-Up L ZL
//! byte  5      buttons   Home Capture GR GL Chat
//! bytes 6..9   left stick  (12-bit X, 12-bit Y, nibble interleaved)
//! bytes 9..12  right stick (same packing)
//! byte 13      left trigger
//! byte 14      right trigger
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest report that still carries every field the decoder reads.
pub const MIN_REPORT_LEN: usize = 15;

/// Center value of the 12-bit stick samples.
const STICK_CENTER: f32 = 2048.0;

const LEFT_STICK_OFFSET: usize = 6;
const RIGHT_STICK_OFFSET: usize = 9;
const LEFT_TRIGGER_OFFSET: usize = 13;
const RIGHT_TRIGGER_OFFSET: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed report: {len} bytes, at least {} required", MIN_REPORT_LEN)]
    MalformedReport { len: usize },
}

/// Digital buttons of the controller, d-pad excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    A,
    B,
    X,
    Y,
    L,
    R,
    Z,
    ZL,
    StartPause,
    Home,
    Capture,
    GR,
    GL,
    Chat,
}

impl Button {
    pub const ALL: [Button; 14] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::L,
        Button::R,
        Button::Z,
        Button::ZL,
        Button::StartPause,
        Button::Home,
        Button::Capture,
        Button::GR,
        Button::GL,
        Button::Chat,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::X => "X",
            Button::Y => "Y",
            Button::L => "L",
            Button::R => "R",
            Button::Z => "Z",
            Button::ZL => "ZL",
            Button::StartPause => "Start/Pause",
            Button::Home => "Home",
            Button::Capture => "Capture",
            Button::GR => "GR",
            Button::GL => "GL",
            Button::Chat => "Chat",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DpadDirection {
    Up,
    Down,
    Left,
    Right,
}

impl DpadDirection {
    pub const ALL: [DpadDirection; 4] = [
        DpadDirection::Up,
        DpadDirection::Down,
        DpadDirection::Left,
        DpadDirection::Right,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DpadDirection::Up => "Up",
            DpadDirection::Down => "Down",
            DpadDirection::Left => "Left",
            DpadDirection::Right => "Right",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of pressed buttons, one bit per [`Button`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(u16);

impl ButtonSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    pub fn contains(&self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.contains(*b))
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = Button>>(iter: I) -> Self {
        let mut set = ButtonSet::empty();
        for button in iter {
            set.insert(button);
        }
        set
    }
}

/// All d-pad directions reported as active.
///
/// The four d-pad bits are independent on the wire, so diagonals (or glitched reports)
/// can carry more than one direction. The decoder keeps all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DpadSet(u8);

impl DpadSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, direction: DpadDirection) {
        self.0 |= direction.bit();
    }

    pub fn contains(&self, direction: DpadDirection) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = DpadDirection> + '_ {
        DpadDirection::ALL
            .into_iter()
            .filter(|d| self.contains(*d))
    }
}

impl FromIterator<DpadDirection> for DpadSet {
    fn from_iter<I: IntoIterator<Item = DpadDirection>>(iter: I) -> Self {
        let mut set = DpadSet::empty();
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}

/// Normalized stick position. Raw samples map to `[-1.0, 1.0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickPosition {
    pub x: f32,
    pub y: f32,
}

impl StickPosition {
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(-1.0, 1.0),
            y: self.y.clamp(-1.0, 1.0),
        }
    }
}

/// One decoded snapshot of every controller input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    pub buttons: ButtonSet,
    pub dpad: DpadSet,
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
    pub left_trigger_raw: u8,
    pub right_trigger_raw: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportInput {
    Button(Button),
    Dpad(DpadDirection),
}

/// `(byte_index, bit_mask, input)` for every digital input in the report.
const INPUT_LAYOUT: [(usize, u8, ReportInput); 18] = [
    (3, 0x01, ReportInput::Button(Button::B)),
    (3, 0x02, ReportInput::Button(Button::A)),
    (3, 0x04, ReportInput::Button(Button::Y)),
    (3, 0x08, ReportInput::Button(Button::X)),
    (3, 0x10, ReportInput::Button(Button::R)),
    (3, 0x20, ReportInput::Button(Button::Z)),
    (3, 0x40, ReportInput::Button(Button::StartPause)),
    (4, 0x01, ReportInput::Dpad(DpadDirection::Down)),
    (4, 0x02, ReportInput::Dpad(DpadDirection::Right)),
    (4, 0x04, ReportInput::Dpad(DpadDirection::Left)),
    (4, 0x08, ReportInput::Dpad(DpadDirection::Up)),
    (4, 0x10, ReportInput::Button(Button::L)),
    (4, 0x20, ReportInput::Button(Button::ZL)),
    (5, 0x01, ReportInput::Button(Button::Home)),
    (5, 0x02, ReportInput::Button(Button::Capture)),
    (5, 0x04, ReportInput::Button(Button::GR)),
    (5, 0x08, ReportInput::Button(Button::GL)),
    (5, 0x10, ReportInput::Button(Button::Chat)),
];

/// Decodes one raw report into an [`InputFrame`].
///
/// Reports shorter than [`MIN_REPORT_LEN`] are rejected as a whole; trailing bytes past
/// the last field are ignored.
pub fn decode(report: &[u8]) -> Result<InputFrame, DecodeError> {
    if report.len() < MIN_REPORT_LEN {
        return Err(DecodeError::MalformedReport { len: report.len() });
    }

    let mut buttons = ButtonSet::empty();
    let mut dpad = DpadSet::empty();
    for (byte_index, mask, input) in INPUT_LAYOUT {
        if report[byte_index] & mask == 0 {
            continue;
        }
        match input {
            ReportInput::Button(button) => buttons.insert(button),
            ReportInput::Dpad(direction) => dpad.insert(direction),
        }
    }

    Ok(InputFrame {
        buttons,
        dpad,
        left_stick: decode_stick(report, LEFT_STICK_OFFSET),
        right_stick: decode_stick(report, RIGHT_STICK_OFFSET),
        left_trigger_raw: report[LEFT_TRIGGER_OFFSET],
        right_trigger_raw: report[RIGHT_TRIGGER_OFFSET],
    })
}

/// Unpacks the 12-bit X/Y pair stored in three bytes starting at `offset`.
pub fn unpack_stick(report: &[u8], offset: usize) -> (u16, u16) {
    let lo = report[offset] as u16;
    let mid = report[offset + 1] as u16;
    let hi = report[offset + 2] as u16;
    let x = lo | ((mid & 0x0F) << 8);
    let y = (mid >> 4) | (hi << 4);
    (x, y)
}

pub fn normalize_axis(raw: u16) -> f32 {
    (raw as f32 - STICK_CENTER) / STICK_CENTER
}

fn decode_stick(report: &[u8], offset: usize) -> StickPosition {
    let (x, y) = unpack_stick(report, offset);
    StickPosition {
        x: normalize_axis(x),
        y: normalize_axis(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn neutral_report() -> [u8; 64] {
        let mut report = [0u8; 64];
        // 2048 / 2048 on both sticks
        for offset in [LEFT_STICK_OFFSET, RIGHT_STICK_OFFSET] {
            report[offset] = 0x00;
            report[offset + 1] = 0x08;
            report[offset + 2] = 0x80;
        }
        report
    }

    #[test]
    fn short_report_is_malformed() {
        for len in 0..MIN_REPORT_LEN {
            let report = vec![0xFF; len];
            assert_eq!(decode(&report), Err(DecodeError::MalformedReport { len }));
        }
    }

    #[test]
    fn byte3_bit0_is_b() {
        let mut report = neutral_report();
        report[3] = 0x01;
        let frame = decode(&report).unwrap();
        assert_eq!(frame.buttons.iter().collect::<Vec<_>>(), vec![Button::B]);
        assert!(frame.dpad.is_empty());
    }

    #[test]
    fn every_layout_entry_decodes_alone() {
        for (byte_index, mask, input) in INPUT_LAYOUT {
            let mut report = neutral_report();
            report[byte_index] = mask;
            let frame = decode(&report).unwrap();
            match input {
                ReportInput::Button(button) => {
                    assert_eq!(frame.buttons.len(), 1);
                    assert!(frame.buttons.contains(button));
                    assert!(frame.dpad.is_empty());
                }
                ReportInput::Dpad(direction) => {
                    assert!(frame.buttons.is_empty());
                    assert_eq!(frame.dpad.iter().collect::<Vec<_>>(), vec![direction]);
                }
            }
        }
    }

    #[test]
    fn diagonal_dpad_keeps_both_directions() {
        let mut report = neutral_report();
        report[4] = 0x08 | 0x02;
        let frame = decode(&report).unwrap();
        assert!(frame.dpad.contains(DpadDirection::Up));
        assert!(frame.dpad.contains(DpadDirection::Right));
        assert!(!frame.dpad.contains(DpadDirection::Down));
    }

    #[test]
    fn stick_normalization_reference_points() {
        assert_eq!(normalize_axis(2048), 0.0);
        assert_eq!(normalize_axis(0), -1.0);
        assert!((normalize_axis(4095) - 2047.0 / 2048.0).abs() < f32::EPSILON);
    }

    #[test]
    fn stick_nibbles_are_interleaved() {
        let mut report = neutral_report();
        // X = 0xABC, Y = 0x123
        report[LEFT_STICK_OFFSET] = 0xBC;
        report[LEFT_STICK_OFFSET + 1] = 0x3A;
        report[LEFT_STICK_OFFSET + 2] = 0x12;
        assert_eq!(unpack_stick(&report, LEFT_STICK_OFFSET), (0xABC, 0x123));

        let frame = decode(&report).unwrap();
        assert_eq!(frame.left_stick.x, normalize_axis(0xABC));
        assert_eq!(frame.left_stick.y, normalize_axis(0x123));
        assert_eq!(frame.right_stick, StickPosition { x: 0.0, y: 0.0 });
    }

    #[test]
    fn triggers_are_read_verbatim() {
        let mut report = neutral_report();
        report[LEFT_TRIGGER_OFFSET] = 110;
        report[RIGHT_TRIGGER_OFFSET] = 255;
        let frame = decode(&report[..MIN_REPORT_LEN]).unwrap();
        assert_eq!(frame.left_trigger_raw, 110);
        assert_eq!(frame.right_trigger_raw, 255);
    }

    proptest! {
        #[test]
        fn any_long_enough_report_decodes(report in proptest::collection::vec(any::<u8>(), MIN_REPORT_LEN..80)) {
            let frame = decode(&report).unwrap();
            for (byte_index, mask, input) in INPUT_LAYOUT {
                let expected = report[byte_index] & mask != 0;
                let actual = match input {
                    ReportInput::Button(button) => frame.buttons.contains(button),
                    ReportInput::Dpad(direction) => frame.dpad.contains(direction),
                };
                prop_assert_eq!(expected, actual);
            }
            for value in [frame.left_stick.x, frame.left_stick.y, frame.right_stick.x, frame.right_stick.y] {
                prop_assert!((-1.0..1.0).contains(&value));
            }
        }

        #[test]
        fn short_reports_never_decode(report in proptest::collection::vec(any::<u8>(), 0..MIN_REPORT_LEN)) {
            prop_assert!(decode(&report).is_err());
        }
    }
}
