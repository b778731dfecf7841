//! Live view of the controller: buttons, d-pad, sticks and triggers.
//!
//! The panel only ever shows the most recent frame it was handed. Frames arrive throttled,
//! so this is a monitor, not a recorder.

use crate::calibration::{CalibrationProfile, TriggerSide};
use crate::controller::report::{Button, DpadDirection, InputFrame, StickPosition};
use eframe::egui::{self, vec2, ProgressBar, Sense, Stroke, Ui};

use super::common::{create_frame, UiColors};

const STICK_PLOT_SIZE: f32 = 120.0;
const STICK_DOT_RADIUS: f32 = 6.0;

#[derive(Default)]
pub struct InputPanel {
    frame: Option<InputFrame>,
}

impl InputPanel {
    pub fn show_frame(&mut self, frame: InputFrame) {
        self.frame = Some(frame);
    }

    /// Back to the resting view after the session ended.
    pub fn reset(&mut self) {
        self.frame = None;
    }

    #[cfg(test)]
    fn last_frame(&self) -> Option<&InputFrame> {
        self.frame.as_ref()
    }

    pub fn render(&mut self, ui: &mut Ui, profile: &CalibrationProfile) {
        let frame = self.frame.unwrap_or_default();

        ui.heading("Input");
        if self.frame.is_none() {
            ui.label("Waiting for controller input");
        }

        create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
            ui.label("Buttons");
            ui.horizontal_wrapped(|ui| {
                for button in Button::ALL {
                    let _ = ui.selectable_label(frame.buttons.contains(button), button.label());
                }
            });
        });

        ui.horizontal(|ui| {
            create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
                ui.label("D-Pad");
                render_dpad(ui, &frame);
            });
            create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
                ui.label("Left Stick");
                render_stick(ui, frame.left_stick);
            });
            create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
                ui.label("Right Stick");
                render_stick(ui, frame.right_stick);
            });
        });

        create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
            ui.label("Triggers");
            render_trigger(ui, "L", frame.left_trigger_raw, profile, TriggerSide::Left);
            render_trigger(ui, "R", frame.right_trigger_raw, profile, TriggerSide::Right);
        });
    }
}

/// Every active direction lights up, diagonals included.
fn render_dpad(ui: &mut Ui, frame: &InputFrame) {
    let cell = |ui: &mut Ui, direction: DpadDirection, arrow: &str| {
        let _ = ui.selectable_label(frame.dpad.contains(direction), arrow);
    };

    egui::Grid::new("dpad_grid")
        .spacing(vec2(2.0, 2.0))
        .show(ui, |ui| {
            ui.label("");
            cell(ui, DpadDirection::Up, "⬆");
            ui.label("");
            ui.end_row();

            cell(ui, DpadDirection::Left, "⬅");
            ui.label("");
            cell(ui, DpadDirection::Right, "➡");
            ui.end_row();

            ui.label("");
            cell(ui, DpadDirection::Down, "⬇");
            ui.label("");
            ui.end_row();
        });
}

fn render_stick(ui: &mut Ui, position: StickPosition) {
    let (response, painter) =
        ui.allocate_painter(vec2(STICK_PLOT_SIZE, STICK_PLOT_SIZE), Sense::hover());
    let rect = response.rect;
    let center = rect.center();
    let radius = STICK_PLOT_SIZE / 2.0 - STICK_DOT_RADIUS;

    painter.rect_filled(rect, 4.0, UiColors::EXTREME_BG);
    painter.circle_stroke(center, radius, Stroke::new(1.0, UiColors::BORDER));
    painter.line_segment(
        [center - vec2(radius, 0.0), center + vec2(radius, 0.0)],
        Stroke::new(1.0, UiColors::BORDER),
    );
    painter.line_segment(
        [center - vec2(0.0, radius), center + vec2(0.0, radius)],
        Stroke::new(1.0, UiColors::BORDER),
    );

    let position = position.clamped();
    // screen y grows downwards
    let dot = center + vec2(position.x * radius, -position.y * radius);
    painter.circle_filled(dot, STICK_DOT_RADIUS, UiColors::ACTIVE);

    ui.label(format!("{:+.2}, {:+.2}", position.x, position.y));
}

fn render_trigger(
    ui: &mut Ui,
    name: &str,
    raw: u8,
    profile: &CalibrationProfile,
    side: TriggerSide,
) {
    let calibrated = profile.calibrate(side, raw);
    ui.horizontal(|ui| {
        ui.label(name);
        ui.add(
            ProgressBar::new(raw as f32 / 255.0)
                .desired_width(220.0)
                .text(format!("raw {}", raw)),
        );
        ui.add(
            ProgressBar::new(calibrated as f32 / 255.0)
                .desired_width(220.0)
                .fill(UiColors::ACTIVE.gamma_multiply(0.6))
                .text(format!("out {}", calibrated)),
        );
    });
}
