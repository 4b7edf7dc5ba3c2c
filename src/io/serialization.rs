// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Region snapshot files.
//!
//! A snapshot is written as YAML or JSON, chosen from the file extension,
//! and can be imported later to resume labeling the same image.

use crate::models::snapshot::RegionSnapshot;
use anyhow::{bail, Context, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            other => bail!("Unsupported file extension: {:?}", other),
        }
    }
}

/// Write a snapshot to `path` (`.yaml`, `.yml` or `.json`).
pub fn export(data: &RegionSnapshot, path: &Path) -> Result<()> {
    let text = match Format::of(path)? {
        Format::Yaml => serde_yaml::to_string(data)?,
        Format::Json => serde_json::to_string_pretty(data)?,
    };
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Read a snapshot written by [`export`].
pub fn import(path: &Path) -> Result<RegionSnapshot> {
    let format = Format::of(path)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let data = match format {
        Format::Yaml => serde_yaml::from_str(&text)?,
        Format::Json => serde_json::from_str(&text)?,
    };
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::region::{GlyphLabel, Label, LabelSource, MzlNumber, Region};
    use crate::util::geometry::{DisplayRect, NativeRect};

    fn sample() -> RegionSnapshot {
        let mut snapshot = RegionSnapshot {
            image_path: "tablet.jpg".to_string(),
            image_width: 1600,
            image_height: 1200,
            regions: Vec::new(),
        };
        let mut region = Region::new(
            DisplayRect::new(50.0, 50.0, 100.0, 100.0),
            NativeRect::new(100, 100, 200, 200),
        );
        region.label = Some(Label {
            glyph: GlyphLabel::new(MzlNumber(13), "X", "NAME"),
            source: LabelSource::Corrected {
                predicted_confidence: 42.5,
            },
        });
        snapshot.regions.push(region);
        snapshot.regions.push(Region::new(
            DisplayRect::new(0.0, 0.0, 10.0, 10.0),
            NativeRect::new(0, 0, 20, 20),
        ));
        snapshot
    }

    #[test]
    fn test_yaml_export_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.yaml");
        export(&sample(), &path).unwrap();
        assert_eq!(import(&path).unwrap(), sample());
    }

    #[test]
    fn test_json_export_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");
        export(&sample(), &path).unwrap();
        assert_eq!(import(&path).unwrap(), sample());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::of(Path::new("a.yml")).unwrap(), Format::Yaml);
        assert_eq!(Format::of(Path::new("a.json")).unwrap(), Format::Json);
        assert!(Format::of(Path::new("a")).is_err());
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert!(export(&sample(), &dir.path().join("regions.xml")).is_err());
    }
}
