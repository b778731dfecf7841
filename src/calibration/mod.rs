//! Trigger calibration
//!
//! The analog triggers rest well above zero and hit a physical "bump" before the digital
//! L/R switch clicks in. A [`CalibrationProfile`] stores three breakpoints per trigger:
//!
//! ```text
//! raw   0 ........ base ............ bump ........ max ..... 255
//! out   0          0                 255 (bump mode)
//!                                     ... 255 (press mode at max)
//! ```
//!
//! [`calibrate`] is a pure function of the raw byte and the breakpoints. The profile itself
//! is a plain value: the orchestrator publishes immutable copies of it to the reader thread,
//! so nothing in here needs synchronization.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BASE: f64 = 32.0;
pub const DEFAULT_BUMP: f64 = 190.0;
pub const DEFAULT_MAX: f64 = 230.0;

/// Which breakpoint defines 100% output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullScale {
    /// Full output at the bump breakpoint.
    Bump,
    /// Full output only when pressed through to the max breakpoint.
    Press,
}

/// Virtual controller flavour requested by the user.
///
/// Only `Xbox360` drives the sink; `DualShock` is kept so existing records round-trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmulationMode {
    #[default]
    Xbox360,
    DualShock,
}

impl fmt::Display for EmulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulationMode::Xbox360 => write!(f, "Xbox 360"),
            EmulationMode::DualShock => write!(f, "DualShock"),
        }
    }
}

/// Breakpoints of a single trigger on the raw `[0, 255]` domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerBreakpoints {
    pub base: f64,
    pub bump: f64,
    pub max: f64,
}

impl TriggerBreakpoints {
    /// `base <= bump <= max`. Calibration still works for malformed values, it just
    /// degrades to a constant output.
    pub fn is_ordered(&self) -> bool {
        self.base <= self.bump && self.bump <= self.max
    }
}

impl Default for TriggerBreakpoints {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            bump: DEFAULT_BUMP,
            max: DEFAULT_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSide {
    Left,
    Right,
}

/// Calibration record shared by the UI, the persistence layer and the emulation bridge.
///
/// Field names match the durable record. Missing fields fall back to the defaults and
/// unknown fields are ignored when loading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    pub left_base: f64,
    pub left_bump: f64,
    pub left_max: f64,
    pub right_base: f64,
    pub right_bump: f64,
    pub right_max: f64,
    pub bump_100_percent: bool,
    pub emulation_mode: EmulationMode,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            left_base: DEFAULT_BASE,
            left_bump: DEFAULT_BUMP,
            left_max: DEFAULT_MAX,
            right_base: DEFAULT_BASE,
            right_bump: DEFAULT_BUMP,
            right_max: DEFAULT_MAX,
            bump_100_percent: true,
            emulation_mode: EmulationMode::Xbox360,
        }
    }
}

impl CalibrationProfile {
    pub fn breakpoints(&self, side: TriggerSide) -> TriggerBreakpoints {
        match side {
            TriggerSide::Left => TriggerBreakpoints {
                base: self.left_base,
                bump: self.left_bump,
                max: self.left_max,
            },
            TriggerSide::Right => TriggerBreakpoints {
                base: self.right_base,
                bump: self.right_bump,
                max: self.right_max,
            },
        }
    }

    pub fn set_breakpoints(&mut self, side: TriggerSide, breakpoints: TriggerBreakpoints) {
        match side {
            TriggerSide::Left => {
                self.left_base = breakpoints.base;
                self.left_bump = breakpoints.bump;
                self.left_max = breakpoints.max;
            }
            TriggerSide::Right => {
                self.right_base = breakpoints.base;
                self.right_bump = breakpoints.bump;
                self.right_max = breakpoints.max;
            }
        }
    }

    pub fn full_scale(&self) -> FullScale {
        if self.bump_100_percent {
            FullScale::Bump
        } else {
            FullScale::Press
        }
    }

    /// Calibrated output of one trigger under this profile.
    pub fn calibrate(&self, side: TriggerSide, raw: u8) -> u8 {
        calibrate(raw, self.breakpoints(side), self.full_scale())
    }
}

/// Maps a raw trigger byte onto `[0, 255]`.
///
/// Values at or below `base` read as 0; the selected full-scale breakpoint reads as 255.
/// A zero, negative or NaN range yields 0 for every input.
pub fn calibrate(raw: u8, breakpoints: TriggerBreakpoints, full_scale: FullScale) -> u8 {
    let shifted = (raw as f64 - breakpoints.base).max(0.0);
    let range = match full_scale {
        FullScale::Bump => breakpoints.bump - breakpoints.base,
        FullScale::Press => breakpoints.max - breakpoints.base,
    };

    if !(range > 0.0) {
        return 0;
    }

    (shifted / range * 255.0).round().clamp(0.0, 255.0) as u8
}
