// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! File-backed archive of saved glyphs.
//!
//! Human labels and machine predictions are kept in two record lists. Each
//! record points at an archived image by id; an image is identified by its
//! name together with its bytes, so two uploads sharing a name stay apart.
//! Accepted records are held in memory until [`PersistenceService::commit`]
//! writes the whole archive once for the batch.

use crate::services::{PersistenceService, SavePayload, SaveResponse};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One uploaded image referenced by archived records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedImage {
    pub id: u32,
    pub img_name: String,
    /// Base64 JPEG
    pub img: String,
}

/// One archived glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub image_id: u32,
    pub img_name: String,
    pub bbox: [u32; 4],
    pub mzl_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl ArchiveRecord {
    fn from_payload(image_id: u32, payload: &SavePayload) -> Self {
        Self {
            image_id,
            img_name: payload.img_name.clone(),
            bbox: payload.bbox,
            mzl_number: payload.mzl_number,
            confidence: payload.confidence,
        }
    }

    /// Duplicates share image, box and label. Predictions also compare
    /// confidence, so the same box classified with another score is a new
    /// record.
    fn same_glyph(&self, other: &ArchiveRecord) -> bool {
        self.image_id == other.image_id
            && self.bbox == other.bbox
            && self.mzl_number == other.mzl_number
            && self.confidence == other.confidence
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ArchiveData {
    #[serde(default)]
    images: Vec<ArchivedImage>,
    #[serde(default)]
    annotations: Vec<ArchiveRecord>,
    #[serde(default)]
    classifications: Vec<ArchiveRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Annotation,
    Classification,
}

/// List lengths as of the last successful write.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    images: usize,
    annotations: usize,
    classifications: usize,
}

pub struct JsonArchive {
    path: PathBuf,
    data: ArchiveData,
    /// Set while records are accepted but not yet written
    uncommitted: Option<Checkpoint>,
}

impl JsonArchive {
    /// Open the archive at `path`, starting empty if the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read archive {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("corrupt archive {}", path.display()))?
        } else {
            ArchiveData::default()
        };
        log::info!(
            "Archive {}: {} images, {} annotations, {} classifications",
            path.display(),
            data.images.len(),
            data.annotations.len(),
            data.classifications.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            data,
            uncommitted: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn annotations(&self) -> &[ArchiveRecord] {
        &self.data.annotations
    }

    pub fn classifications(&self) -> &[ArchiveRecord] {
        &self.data.classifications
    }

    pub fn image(&self, id: u32) -> Option<&ArchivedImage> {
        self.data.images.iter().find(|image| image.id == id)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            images: self.data.images.len(),
            annotations: self.data.annotations.len(),
            classifications: self.data.classifications.len(),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.data.images.truncate(checkpoint.images);
        self.data.annotations.truncate(checkpoint.annotations);
        self.data.classifications.truncate(checkpoint.classifications);
    }

    fn flush(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Id of the archived image with this name and content, adding it if new.
    fn image_id(&mut self, payload: &SavePayload) -> u32 {
        if let Some(image) = self
            .data
            .images
            .iter()
            .find(|image| image.img_name == payload.img_name && image.img == payload.img)
        {
            return image.id;
        }
        let id = self.data.images.iter().map(|image| image.id + 1).max().unwrap_or(0);
        self.data.images.push(ArchivedImage {
            id,
            img_name: payload.img_name.clone(),
            img: payload.img.clone(),
        });
        id
    }

    fn insert(&mut self, kind: RecordKind, payload: &SavePayload) -> Result<SaveResponse> {
        let checkpoint = self.checkpoint();
        let image_id = self.image_id(payload);
        let record = ArchiveRecord::from_payload(image_id, payload);
        let records = match kind {
            RecordKind::Annotation => &mut self.data.annotations,
            RecordKind::Classification => &mut self.data.classifications,
        };
        if records.iter().any(|r| r.same_glyph(&record)) {
            // Drop the image again if this payload introduced it
            self.data.images.truncate(checkpoint.images);
            return Ok(SaveResponse::failed(format!(
                "{} with the bbox {:?} already exists in the archive for {}",
                record.mzl_number, record.bbox, record.img_name
            )));
        }
        records.push(record.clone());
        self.uncommitted.get_or_insert(checkpoint);

        let message = match record.confidence {
            Some(confidence) => format!(
                "{} with {}% has been saved successfully",
                record.mzl_number, confidence
            ),
            None => format!(
                "{} with the bbox {:?} has been saved successfully",
                record.mzl_number, record.bbox
            ),
        };
        Ok(SaveResponse::ok(message))
    }
}

impl PersistenceService for JsonArchive {
    fn save_annotation(&mut self, payload: &SavePayload) -> Result<SaveResponse> {
        self.insert(RecordKind::Annotation, payload)
    }

    fn save_classification(&mut self, payload: &SavePayload) -> Result<SaveResponse> {
        self.insert(RecordKind::Classification, payload)
    }

    /// Write the archive once for every record accepted since the last
    /// commit. On failure those records are dropped from memory too.
    fn commit(&mut self) -> Result<()> {
        let Some(checkpoint) = self.uncommitted.take() else {
            return Ok(());
        };
        if let Err(e) = self.flush() {
            self.rollback(checkpoint);
            return Err(e);
        }
        log::debug!("Archive written to {}", self.path.display());
        Ok(())
    }
}
