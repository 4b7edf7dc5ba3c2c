// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration.
//!
//! Read from a YAML file named by `GLYPH_ANNOTATOR_CONFIG`, else from
//! `glyph-annotator.yaml` in the working directory, else defaults. Every field
//! is optional in the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "GLYPH_ANNOTATOR_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "glyph-annotator.yaml";

/// Bounds of the display copy shown on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayBounds {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for DisplayBounds {
    fn default() -> Self {
        Self {
            max_width: 700,
            max_height: 700,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub display: DisplayBounds,
    /// Edge of the crop preview thumbnails
    pub preview_size: u32,
    /// Edge of the result thumbnails
    pub thumbnail_size: u32,
    pub archive_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    /// Reference glyph images for the template classifier
    pub templates_dir: Option<PathBuf>,
    /// Run the whole workflow without persisting anything
    pub demo_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            display: DisplayBounds::default(),
            preview_size: 200,
            thumbnail_size: 100,
            archive_path: PathBuf::from("glyph_archive.json"),
            catalog_path: None,
            templates_dir: None,
            demo_mode: false,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_yaml::from_str(&yaml)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the config file location and load it.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            log::info!("Loading config from {} ({})", path, CONFIG_ENV);
            return Self::from_file(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            log::info!("Loading config from {}", default_path.display());
            return Self::from_file(default_path);
        }
        log::info!("No config file, using defaults");
        Ok(Self::default())
    }
}
