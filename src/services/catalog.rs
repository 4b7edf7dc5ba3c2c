// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Glyph catalog (resource lookup).
//!
//! Maps MZL numbers to sign names, glyphs and phonetic values. The catalog is
//! read from a JSON or YAML file keyed by MZL number.

use super::classifier::MZL_LABELS;
use super::GlyphLookup;
use crate::models::region::{GlyphLabel, MzlNumber};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphInfo {
    pub mzl_number: u32,
    #[serde(default)]
    pub glyph_name: Option<String>,
    #[serde(default)]
    pub glyph: Option<String>,
    #[serde(default)]
    pub glyph_phonetic: Option<Vec<String>>,
}

impl GlyphInfo {
    fn bare(mzl_number: u32) -> Self {
        Self {
            mzl_number,
            glyph_name: None,
            glyph: None,
            glyph_phonetic: None,
        }
    }

    pub fn label(&self) -> GlyphLabel {
        GlyphLabel::new(
            MzlNumber(self.mzl_number),
            self.glyph.clone().unwrap_or_default(),
            self.glyph_name.clone().unwrap_or_default(),
        )
    }

    /// Selector entry: `13 X - NAME`.
    pub fn choice(&self) -> String {
        self.label().summary()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlyphCatalog {
    glyphs: BTreeMap<u32, GlyphInfo>,
}

impl GlyphCatalog {
    pub fn new(glyphs: impl IntoIterator<Item = GlyphInfo>) -> Self {
        Self {
            glyphs: glyphs.into_iter().map(|g| (g.mzl_number, g)).collect(),
        }
    }

    /// The classifier's label set, numbers only.
    pub fn placeholder() -> Self {
        Self::new(MZL_LABELS.iter().map(|&n| GlyphInfo::bare(n)))
    }

    /// Load a catalog from JSON or YAML depending on the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let extension = path.extension().and_then(|s| s.to_str());
        let glyphs: BTreeMap<u32, GlyphInfo> = match extension {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
            Some("json") => serde_json::from_str(&text)?,
            _ => bail!("unsupported catalog extension: {:?}", extension),
        };
        log::info!("Loaded {} glyphs from {}", glyphs.len(), path.display());
        Ok(Self::new(glyphs.into_values()))
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn info(&self, mzl_number: MzlNumber) -> Option<&GlyphInfo> {
        self.glyphs.get(&mzl_number.0)
    }

    /// Selector entries in MZL order.
    pub fn choices(&self) -> Vec<(MzlNumber, String)> {
        self.glyphs
            .values()
            .map(|info| (MzlNumber(info.mzl_number), info.choice()))
            .collect()
    }
}

impl GlyphLookup for GlyphCatalog {
    fn lookup(&self, mzl_number: MzlNumber) -> Option<GlyphLabel> {
        self.info(mzl_number).map(GlyphInfo::label)
    }
}
