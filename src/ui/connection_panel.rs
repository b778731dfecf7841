use crate::controller::device_session::SessionState;
use crate::orchestrator::Orchestrator;
use eframe::egui::{Button, Color32, RichText, Ui, Vec2};
use tracing::debug;

use super::common::{create_frame, UiColors};

/// Connect / emulate buttons and the status line.
pub struct ConnectionPanel {
    status: String,
}

impl ConnectionPanel {
    pub fn new() -> Self {
        Self {
            status: "Not connected".to_string(),
        }
    }

    pub fn set_status(&mut self, status: String) {
        debug!("Status: {}", status);
        self.status = status;
    }

    pub fn render(&mut self, ui: &mut Ui, orchestrator: &mut Orchestrator) {
        let connected = orchestrator.is_connected();
        let emulating = orchestrator.is_emulating();
        let state = orchestrator.session_state();
        let button_size = Vec2 { x: 140.0, y: 24.0 };

        create_frame(UiColors::INNER_BG, UiColors::BORDER).show(ui, |ui| {
            ui.horizontal(|ui| {
                let connect_label = if connected { "Disconnect" } else { "Connect" };
                if ui
                    .add(Button::new(connect_label).min_size(button_size))
                    .clicked()
                {
                    // failures arrive as status updates
                    let _ = orchestrator.toggle_connection();
                }

                let emulate_label = if emulating {
                    "Stop Emulation"
                } else {
                    "Start Emulation"
                };
                let emulate = ui
                    .add_enabled(
                        connected && orchestrator.emulation_available(),
                        Button::new(emulate_label).min_size(button_size),
                    )
                    .on_disabled_hover_text(if connected {
                        "No virtual controller driver available"
                    } else {
                        "Connect the controller first"
                    });
                if emulate.clicked() {
                    let _ = orchestrator.toggle_emulation();
                }

                ui.separator();
                ui.label(RichText::new("●").color(state_color(state)));
                ui.label(format!("{}", state));
                ui.separator();
                ui.label(self.status.as_str());
            });
        });
    }
}

fn state_color(state: SessionState) -> Color32 {
    match state {
        SessionState::Reading => UiColors::ACTIVE,
        SessionState::Connecting | SessionState::Connected | SessionState::Disconnecting => {
            UiColors::PENDING
        }
        SessionState::Idle | SessionState::Failed(_) => UiColors::INACTIVE,
    }
}
