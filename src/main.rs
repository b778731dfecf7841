pub mod calibration;
pub mod config;
pub mod controller;
pub mod emulation;
pub mod orchestrator;
pub mod persistence;
pub mod ui;

use crate::persistence::ConfigStore;
use crate::ui::BridgeApp;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    setup()?;

    let store = ConfigStore::default_location();
    info!("Using config directory {}", store.base_path().display());
    let settings = store.load_settings();
    let profile = store.load_calibration();

    info!("Starting UI");
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("GameCube Controller Bridge")
            .with_inner_size([980.0, 620.0]),
        ..Default::default()
    };

    eframe::run_native(
        "gcbridge",
        native_options,
        Box::new(move |cc| Ok(Box::new(BridgeApp::new(cc, settings, store, profile)))),
    )
    .map_err(|e| eyre!("UI failed: {}", e))?;

    info!("Bye");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
