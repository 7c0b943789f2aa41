//! e-xell - a tiny single-document spreadsheet editor
//!
//! Spreadsheets can be saved to disk or to a local key/value "web storage", where they
//! are kept gzip-compressed and base64-encoded under a user-chosen name.

mod app;
mod core;
mod ui;

use app::ExellApp;
use eframe::egui;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    tracing::info!("Starting e-xell...");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 760.0])
            .with_min_inner_size([640.0, 420.0])
            .with_title("e-xell"),
        ..Default::default()
    };

    eframe::run_native(
        "e-xell",
        native_options,
        Box::new(|cc| Ok(Box::new(ExellApp::new(cc)))),
    )
}
