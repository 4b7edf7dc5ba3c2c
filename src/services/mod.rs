// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Collaborators the annotation session talks to.
//!
//! The session only sees these traits: a classifier for cropped glyphs, a
//! lookup for glyph metadata, and a persistence sink for finalized regions.

pub mod catalog;
pub mod classifier;

use crate::models::region::{GlyphLabel, MzlNumber};
use anyhow::Result;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Result of classifying one cropped glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub glyph: GlyphLabel,
    /// Percentage, 0 to 100
    pub confidence: f32,
}

pub trait Classifier {
    /// Classify a native-space crop.
    fn classify(&self, glyph: &DynamicImage) -> Result<Prediction>;
}

pub trait GlyphLookup {
    /// Canonical metadata for a label, `None` if the catalog does not know it.
    fn lookup(&self, mzl_number: MzlNumber) -> Option<GlyphLabel>;
}

/// What the persistence collaborator receives for one finalized region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavePayload {
    /// Upload name without extension
    pub img_name: String,
    /// Full image, JPEG, base64
    pub img: String,
    pub bbox_img: [u32; 4],
    /// Native `[x_min, y_min, x_max, y_max]`
    pub bbox: [u32; 4],
    pub mzl_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Reply of the persistence collaborator for one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub result: bool,
    pub message: String,
}

impl SaveResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            result: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result: false,
            message: message.into(),
        }
    }
}

pub trait PersistenceService {
    /// Store a human-confirmed label. `Err` means the service is unavailable.
    fn save_annotation(&mut self, payload: &SavePayload) -> Result<SaveResponse>;

    /// Store a machine prediction with its confidence.
    fn save_classification(&mut self, payload: &SavePayload) -> Result<SaveResponse>;

    /// Make the records accepted since the last call durable. Called once at
    /// the end of a save batch; `Err` means none of them were kept.
    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Per-region result of a save batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub index: usize,
    pub mzl_number: MzlNumber,
    pub success: bool,
    pub message: String,
}
