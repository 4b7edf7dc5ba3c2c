// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Glyph Annotator
//!
//! A cross-platform desktop application for annotating cuneiform tablet
//! images: draw boxes around glyphs, classify or label them, correct the
//! labels, and archive the result.

mod app;
mod config;
mod error;
mod io;
mod models;
mod services;
mod ui;
mod util;

use anyhow::Result;
use app::GlyphAnnotatorApp;
use config::AppConfig;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = AppConfig::load()?;
    log::info!(
        "Display bounds {}x{}, archive {}{}",
        config.display.max_width,
        config.display.max_height,
        config.archive_path.display(),
        if config.demo_mode { " (demo mode)" } else { "" }
    );

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Glyph Annotator"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Glyph Annotator",
        options,
        Box::new(|_cc| Ok(Box::new(GlyphAnnotatorApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
