//! Calibration editor.
//!
//! Edits happen on a draft copy. Nothing reaches the reader thread until Apply (commit) or
//! Save (commit and write the record).

use crate::calibration::{CalibrationProfile, EmulationMode, TriggerSide};
use crate::orchestrator::Orchestrator;
use eframe::egui::{DragValue, RadioButton, RichText, Ui};
use tracing::info;

use super::common::{create_frame, UiColors};

pub struct CalibrationPanel {
    draft: CalibrationProfile,
}

impl CalibrationPanel {
    pub fn new(profile: CalibrationProfile) -> Self {
        Self { draft: profile }
    }

    pub fn draft(&self) -> &CalibrationProfile {
        &self.draft
    }

    pub fn render(&mut self, ui: &mut Ui, orchestrator: &Orchestrator) {
        ui.heading("Calibration");

        for (side, title) in [
            (TriggerSide::Left, "Left Trigger"),
            (TriggerSide::Right, "Right Trigger"),
        ] {
            create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
                ui.label(title);
                self.breakpoint_editor(ui, side);
            });
        }

        create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
            ui.label("100% at");
            ui.horizontal(|ui| {
                ui.radio_value(&mut self.draft.bump_100_percent, true, "Bump");
                ui.radio_value(&mut self.draft.bump_100_percent, false, "Full press");
            });

            ui.label("Emulation mode");
            ui.horizontal(|ui| {
                ui.radio_value(
                    &mut self.draft.emulation_mode,
                    EmulationMode::Xbox360,
                    EmulationMode::Xbox360.to_string(),
                );
                ui.add_enabled(
                    false,
                    RadioButton::new(
                        self.draft.emulation_mode == EmulationMode::DualShock,
                        EmulationMode::DualShock.to_string(),
                    ),
                )
                .on_disabled_hover_text("Not supported yet");
            });
        });

        let dirty = *self.draft() != orchestrator.profile();
        ui.horizontal(|ui| {
            if ui.add_enabled(dirty, eframe::egui::Button::new("Apply")).clicked() {
                info!("Applying calibration");
                orchestrator.commit_profile(self.draft);
            }
            if ui.button("Save").clicked() {
                // errors are reported through the status line
                let _ = orchestrator.save_profile(self.draft);
            }
            if ui.add_enabled(dirty, eframe::egui::Button::new("Revert")).clicked() {
                self.draft = orchestrator.profile();
            }
        });
    }

    fn breakpoint_editor(&mut self, ui: &mut Ui, side: TriggerSide) {
        let mut breakpoints = self.draft.breakpoints(side);

        ui.horizontal(|ui| {
            ui.label("Base");
            ui.add(DragValue::new(&mut breakpoints.base).range(0.0..=255.0).speed(0.5));
            ui.label("Bump");
            ui.add(DragValue::new(&mut breakpoints.bump).range(0.0..=255.0).speed(0.5));
            ui.label("Max");
            ui.add(DragValue::new(&mut breakpoints.max).range(0.0..=255.0).speed(0.5));
        });

        if !breakpoints.is_ordered() {
            ui.label(
                RichText::new("Expected base ≤ bump ≤ max").color(UiColors::INACTIVE),
            );
        }

        self.draft.set_breakpoints(side, breakpoints);
    }
}
