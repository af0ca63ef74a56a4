// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! memesmith - meme compositing editor
//!
//! A desktop application for placing styled captions over an uploaded or
//! template image and publishing the flattened result.

use anyhow::{Context, Result};
use memesmith::app::MemeApp;
use memesmith::config::Config;
use memesmith::io::backend::LocalBackend;
use memesmith::render::text::load_font;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let (config, source) = Config::load().context("loading settings")?;
    match source {
        Some(path) => log::info!("Loaded settings from {}", path.display()),
        None => log::info!("Using default settings"),
    }

    let font = load_font(config.editor.font_path.as_deref()).context("loading caption font")?;
    let backend = LocalBackend::open(&config.backend.storage_dir).context("opening local storage")?;
    log::info!("Storing memes under {}", backend.root().display());

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([960.0, 680.0])
            .with_title("memesmith - Meme Editor")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "memesmith",
        options,
        Box::new(move |_cc| Ok(Box::new(MemeApp::new(config, font, backend)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
