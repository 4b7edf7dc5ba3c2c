// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Region data structures.
//!
//! A region is one user-drawn box over the current image. It carries its
//! display rectangle, its native rectangle and at most one label together,
//! so there is never a second list to keep in step with it.

use crate::util::geometry::{DisplayRect, NativeRect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog number of a cuneiform sign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MzlNumber(pub u32);

impl fmt::Display for MzlNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MZL-{}", self.0)
    }
}

impl FromStr for MzlNumber {
    type Err = String;

    /// Accepts `MZL-13`, `13`, or a catalog choice such as `13 X - NAME`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let rest = trimmed
            .strip_prefix("MZL-")
            .or_else(|| trimmed.strip_prefix("mzl-"))
            .unwrap_or(trimmed);
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits
            .parse()
            .map(MzlNumber)
            .map_err(|_| format!("not an MZL number: {s:?}"))
    }
}

/// Glyph metadata attached to a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphLabel {
    pub mzl_number: MzlNumber,
    pub glyph: String,
    pub glyph_name: String,
}

impl GlyphLabel {
    pub fn new(mzl_number: MzlNumber, glyph: impl Into<String>, glyph_name: impl Into<String>) -> Self {
        Self {
            mzl_number,
            glyph: glyph.into(),
            glyph_name: glyph_name.into(),
        }
    }

    /// A label known only by its number.
    pub fn bare(mzl_number: MzlNumber) -> Self {
        Self::new(mzl_number, "", "")
    }

    /// One-line summary, e.g. `13 X - NAME`.
    pub fn summary(&self) -> String {
        match (self.glyph.is_empty(), self.glyph_name.is_empty()) {
            (true, true) => self.mzl_number.0.to_string(),
            _ => format!("{} {} - {}", self.mzl_number.0, self.glyph, self.glyph_name),
        }
    }
}

/// Where a region's label came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LabelSource {
    /// Attached by the classifier
    Predicted { confidence: f32 },
    /// Picked by the user during a manual labeling pass
    Manual,
    /// A prediction the user replaced
    Corrected { predicted_confidence: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub glyph: GlyphLabel,
    pub source: LabelSource,
}

impl Label {
    pub fn predicted(glyph: GlyphLabel, confidence: f32) -> Self {
        Self {
            glyph,
            source: LabelSource::Predicted { confidence },
        }
    }

    pub fn manual(glyph: GlyphLabel) -> Self {
        Self {
            glyph,
            source: LabelSource::Manual,
        }
    }

    pub fn is_corrected(&self) -> bool {
        matches!(self.source, LabelSource::Corrected { .. })
    }

    /// Human-confirmed labels are archived as annotations, predictions as
    /// classifications.
    pub fn is_human(&self) -> bool {
        !matches!(self.source, LabelSource::Predicted { .. })
    }

    /// Confidence of a still-standing prediction.
    pub fn confidence(&self) -> Option<f32> {
        match self.source {
            LabelSource::Predicted { confidence } => Some(confidence),
            _ => None,
        }
    }

    /// Suffix shown next to the label: `(corrected)` or `(97.25%)`.
    pub fn annotation(&self) -> String {
        match self.source {
            LabelSource::Predicted { confidence } => format!("({confidence:.2}%)"),
            LabelSource::Corrected { .. } => "(corrected)".to_string(),
            LabelSource::Manual => String::new(),
        }
    }
}

/// Lifecycle of a region with respect to persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    #[default]
    Pending,
    /// Confirmed for saving
    Finalized,
    /// Accepted by the persistence collaborator
    Saved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub display: DisplayRect,
    pub native: NativeRect,
    pub label: Option<Label>,
    #[serde(default)]
    pub status: RegionStatus,
}

impl Region {
    pub fn new(display: DisplayRect, native: NativeRect) -> Self {
        Self {
            display,
            native,
            label: None,
            status: RegionStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RegionStatus::Pending
    }

    pub fn is_finalized(&self) -> bool {
        self.status != RegionStatus::Pending
    }

    /// Label number as text, empty when unlabeled.
    pub fn label_text(&self) -> String {
        self.label
            .as_ref()
            .map(|l| l.glyph.mzl_number.to_string())
            .unwrap_or_default()
    }
}
