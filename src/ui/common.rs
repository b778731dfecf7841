//! Shared styling for the bridge window.

use eframe::egui::{Color32, Frame, Stroke};

/// Dark theme palette.
pub struct UiColors;

impl UiColors {
    /// Secondary background color for nested components (RGB: 25, 25, 25)
    pub const INNER_BG: Color32 = Color32::from_rgb(25, 25, 25);

    /// Deepest background color, used behind stick plots (RGB: 20, 20, 20)
    pub const EXTREME_BG: Color32 = Color32::from_rgb(20, 20, 20);

    /// Border color for component separation (RGB: 60, 60, 60)
    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);

    /// Pressed inputs and a live session (RGB: 50, 200, 20)
    pub const ACTIVE: Color32 = Color32::from_rgb(50, 200, 20);

    /// Failures and a missing session (RGB: 200, 50, 20)
    pub const INACTIVE: Color32 = Color32::from_rgb(200, 50, 20);

    /// Transitional session states (RGB: 220, 170, 30)
    pub const PENDING: Color32 = Color32::from_rgb(220, 170, 30);
}

/// Bordered frame used for every panel section.
pub fn create_frame(bg_color: Color32, border_color: Color32) -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, border_color))
        .fill(bg_color)
        .inner_margin(6)
        .outer_margin(2)
}
