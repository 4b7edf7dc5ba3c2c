// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Glyph classification pipeline.
//!
//! A crop is reduced to a 100x100 grayscale tensor in `[0, 1]`, a model turns
//! it into one probability per known sign, and the arg-max becomes the
//! predicted MZL label.

use super::{Classifier, GlyphLookup, Prediction};
use crate::models::region::{GlyphLabel, MzlNumber};
use anyhow::{bail, ensure, Context, Result};
use image::{imageops::FilterType, DynamicImage};
use std::path::Path;

/// Signs the classifier knows, in model output order.
pub const MZL_LABELS: [u32; 22] = [
    1, 10, 110, 112, 24, 248, 252, 380, 490, 514, 552, 566, 596, 661, 724, 736, 748, 754, 839,
    859, 869, 89,
];

/// Edge of the square model input.
pub const INPUT_EDGE: u32 = 100;

/// Template extensions tried, in order.
const TEMPLATE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Resize, grayscale and normalize a crop into a row-major model input.
pub fn preprocess(image: &DynamicImage) -> Vec<f32> {
    image
        .resize_exact(INPUT_EDGE, INPUT_EDGE, FilterType::CatmullRom)
        .to_luma8()
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / 255.0)
        .collect()
}

/// Pick the most likely label and its percentage, rounded to two decimals.
pub fn predicted_class(probabilities: &[f32]) -> Option<(MzlNumber, f32)> {
    let (index, probability) = probabilities
        .iter()
        .copied()
        .enumerate()
        .take(MZL_LABELS.len())
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    let percentage = (probability * 100.0 * 100.0).round() / 100.0;
    Some((MzlNumber(MZL_LABELS[index]), percentage))
}

pub trait GlyphModel {
    /// One probability per entry of [`MZL_LABELS`].
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>>;
}

/// Runs a model and resolves its label through the glyph catalog.
pub struct ModelClassifier<M, L> {
    model: M,
    lookup: L,
}

impl<M: GlyphModel, L: GlyphLookup> ModelClassifier<M, L> {
    pub fn new(model: M, lookup: L) -> Self {
        Self { model, lookup }
    }
}

impl<M: GlyphModel, L: GlyphLookup> Classifier for ModelClassifier<M, L> {
    fn classify(&self, glyph: &DynamicImage) -> Result<Prediction> {
        let input = preprocess(glyph);
        let probabilities = self.model.predict(&input)?;
        let (mzl_number, confidence) =
            predicted_class(&probabilities).context("model returned no probabilities")?;
        let glyph = self.lookup.lookup(mzl_number).unwrap_or_else(|| {
            log::warn!("{} is not in the glyph catalog", mzl_number);
            GlyphLabel::bare(mzl_number)
        });
        Ok(Prediction { glyph, confidence })
    }
}

/// Nearest-template model over reference glyph images.
///
/// Each label may have one reference image; similarity is the negative mean
/// squared difference of the preprocessed pixels, turned into probabilities
/// with a softmax. Labels without a reference get probability 0.
pub struct TemplateModel {
    templates: Vec<Option<Vec<f32>>>,
    temperature: f32,
}

impl TemplateModel {
    pub const DEFAULT_TEMPERATURE: f32 = 0.01;

    /// Build from preprocessed templates aligned with [`MZL_LABELS`].
    pub fn from_templates(templates: Vec<Option<Vec<f32>>>, temperature: f32) -> Result<Self> {
        ensure!(
            templates.len() == MZL_LABELS.len(),
            "expected {} templates, got {}",
            MZL_LABELS.len(),
            templates.len()
        );
        ensure!(temperature > 0.0, "temperature must be positive");
        if templates.iter().all(Option::is_none) {
            bail!("no reference templates");
        }
        Ok(Self {
            templates,
            temperature,
        })
    }

    /// Load `<dir>/<mzl>.png` (or `.jpg`/`.jpeg`) for every known label.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut templates = Vec::with_capacity(MZL_LABELS.len());
        for mzl in MZL_LABELS {
            let path = TEMPLATE_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{mzl}.{ext}")))
                .find(|p| p.exists());
            let template = match path {
                Some(path) => {
                    let image = image::open(&path)
                        .with_context(|| format!("failed to open template {}", path.display()))?;
                    Some(preprocess(&image))
                }
                None => None,
            };
            templates.push(template);
        }
        let found = templates.iter().filter(|t| t.is_some()).count();
        log::info!("Loaded {} glyph templates from {}", found, dir.display());
        Self::from_templates(templates, Self::DEFAULT_TEMPERATURE)
    }
}

impl GlyphModel for TemplateModel {
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        let scores: Vec<Option<f32>> = self
            .templates
            .iter()
            .map(|template| {
                template.as_ref().map(|t| {
                    let mse = t
                        .iter()
                        .zip(input)
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f32>()
                        / t.len().max(1) as f32;
                    -mse / self.temperature
                })
            })
            .collect();

        let max = scores
            .iter()
            .flatten()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = scores
            .iter()
            .map(|s| s.map(|s| (s - max).exp()).unwrap_or(0.0))
            .collect();
        let total: f32 = exps.iter().sum();
        ensure!(total > 0.0, "degenerate template scores");
        Ok(exps.into_iter().map(|e| e / total).collect())
    }
}
