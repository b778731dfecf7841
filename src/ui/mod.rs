//! # Bridge Window
//!
//! eframe/egui front end of the bridge. The window is split into three areas:
//!
//! - **Top panel**: connect / emulate buttons, session state and the latest status message
//! - **Right panel**: calibration editor
//! - **Central panel**: live input monitor
//!
//! ## Threading
//!
//! egui owns the UI thread and is the only place presentation state changes. The reader
//! thread talks to it through [`UiPresenter`]: every update is posted on a bounded channel
//! with `try_send` and followed by a repaint request, so the reader never waits on the UI.
//! The channel is drained once per egui frame with `try_recv`.
//!
//! A hidden window stops draining. Frames then stop being queued once the channel is down
//! to its last [`EVENT_RESERVE`] slots, which stay free for status and session-end updates.

pub mod calibration_panel;
pub mod common;
pub mod connection_panel;
pub mod input_panel;

use eframe::egui;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::calibration::CalibrationProfile;
use crate::config::BridgeSettings;
use crate::orchestrator::{Collaborators, Orchestrator, Presenter, UiUpdate};
use crate::persistence::ConfigStore;

use self::calibration_panel::CalibrationPanel;
use self::connection_panel::ConnectionPanel;
use self::input_panel::InputPanel;

/// Capacity of the update channel.
pub const UPDATE_QUEUE_LEN: usize = 64;

/// Slots frames never take.
pub const EVENT_RESERVE: usize = 16;

/// Posts updates to the UI thread and wakes it up.
pub struct UiPresenter {
    sender: mpsc::Sender<UiUpdate>,
    ctx: egui::Context,
}

impl UiPresenter {
    pub fn new(sender: mpsc::Sender<UiUpdate>, ctx: egui::Context) -> Self {
        Self { sender, ctx }
    }
}

impl Presenter for UiPresenter {
    fn present(&self, update: UiUpdate) {
        if matches!(update, UiUpdate::Frame(_)) && self.sender.capacity() <= EVENT_RESERVE {
            // a newer frame follows once the UI drains again
            return;
        }

        match self.sender.try_send(update) {
            Ok(()) => self.ctx.request_repaint(),
            Err(TrySendError::Full(update)) => warn!("UI queue full, dropping {:?}", update),
            // the window is gone
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

pub struct BridgeApp {
    orchestrator: Orchestrator,
    updates: mpsc::Receiver<UiUpdate>,
    connection_panel: ConnectionPanel,
    input_panel: InputPanel,
    calibration_panel: CalibrationPanel,
}

impl BridgeApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: BridgeSettings,
        store: ConfigStore,
        profile: CalibrationProfile,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let (sender, updates) = mpsc::channel(UPDATE_QUEUE_LEN);
        let presenter = Arc::new(UiPresenter::new(sender, cc.egui_ctx.clone()));
        let orchestrator = Orchestrator::new(
            settings,
            store,
            profile,
            Collaborators::system(),
            presenter,
        );

        if !orchestrator.emulation_available() {
            info!("Virtual controller driver not available, emulation disabled");
        }

        Self {
            orchestrator,
            updates,
            connection_panel: ConnectionPanel::new(),
            input_panel: InputPanel::default(),
            calibration_panel: CalibrationPanel::new(profile),
        }
    }

    fn drain_updates(&mut self) {
        while let Ok(update) = self.updates.try_recv() {
            match update {
                UiUpdate::Frame(frame) => self.input_panel.show_frame(frame),
                UiUpdate::Status(status) => self.connection_panel.set_status(status),
                UiUpdate::SessionEnded => {
                    debug!("Session ended, resetting input view");
                    self.input_panel.reset();
                }
            }
        }
    }
}

impl eframe::App for BridgeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_updates();
        ctx.request_repaint_after(Duration::from_millis(33));

        egui::TopBottomPanel::top("connection_panel").show(ctx, |ui| {
            self.connection_panel.render(ui, &mut self.orchestrator);
        });

        egui::SidePanel::right("calibration_panel")
            .resizable(false)
            .show(ctx, |ui| {
                self.calibration_panel.render(ui, &self.orchestrator);
            });

        let profile = self.orchestrator.profile();
        egui::CentralPanel::default().show(ctx, |ui| {
            self.input_panel.render(ui, &profile);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::report::InputFrame;

    #[test]
    fn presenter_posts_in_order_and_survives_closed_window() {
        let (sender, mut updates) = mpsc::channel(UPDATE_QUEUE_LEN);
        let presenter = UiPresenter::new(sender, egui::Context::default());

        presenter.present(UiUpdate::Status("Connected".into()));
        presenter.present(UiUpdate::SessionEnded);
        assert_eq!(
            updates.try_recv().ok(),
            Some(UiUpdate::Status("Connected".into()))
        );
        assert_eq!(updates.try_recv().ok(), Some(UiUpdate::SessionEnded));

        drop(updates);
        presenter.present(UiUpdate::SessionEnded);
    }

    #[test]
    fn undrained_queue_stays_bounded_and_keeps_room_for_events() {
        let (sender, mut updates) = mpsc::channel(UPDATE_QUEUE_LEN);
        let presenter = UiPresenter::new(sender, egui::Context::default());

        for _ in 0..1_000 {
            presenter.present(UiUpdate::Frame(InputFrame::default()));
        }
        presenter.present(UiUpdate::Status("Controller disconnected".into()));
        presenter.present(UiUpdate::SessionEnded);

        let mut received = Vec::new();
        while let Ok(update) = updates.try_recv() {
            received.push(update);
        }
        assert_eq!(received.len(), UPDATE_QUEUE_LEN - EVENT_RESERVE + 2);
        assert_eq!(
            received[received.len() - 2..],
            [
                UiUpdate::Status("Controller disconnected".into()),
                UiUpdate::SessionEnded
            ]
        );

        presenter.present(UiUpdate::Frame(InputFrame::default()));
        assert!(matches!(updates.try_recv(), Ok(UiUpdate::Frame(_))));
    }
}
