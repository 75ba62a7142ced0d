#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

mod alert;
mod app;
mod config;
mod editor;
mod error;
mod flatten;
mod gesture;
mod image_view;
mod layout;
mod library;
mod picker;
mod transform;

use eframe::egui;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::load_or_create().unwrap_or_else(|err| {
        warn!(%err, "could not read settings, using defaults");
        config::Config::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size())
            .with_title("照片编辑"),
        ..Default::default()
    };
    eframe::run_native(
        "Photo Editor",
        options,
        Box::new(move |cc| Ok(Box::new(app::PhotoEditor::new(cc, &config)))),
    )
}
