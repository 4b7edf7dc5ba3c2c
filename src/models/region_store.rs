// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The ordered collection of regions drawn over the current image.
//!
//! Insertion order is display order, and the position in the store is the
//! index the UI uses to address a region. Each entry holds its display and
//! native rectangle together, so removing an index removes every view of that
//! region at once.

use super::region::{GlyphLabel, Label, LabelSource, Region, RegionStatus};
use crate::error::{EngineError, Result};
use crate::util::geometry::{self, ResizeRatio};

/// A mutation applied to one region's label.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionUpdate {
    /// Attach or replace the label as given
    Attach(Label),
    /// Replace the label with a human choice, remembering if it overrode a prediction
    Correct(GlyphLabel),
}

#[derive(Debug, Clone, Default)]
pub struct RegionStore {
    regions: Vec<Region>,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a region and return its index.
    pub fn add(&mut self, region: Region) -> usize {
        self.regions.push(region);
        self.regions.len() - 1
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Region> {
        let len = self.regions.len();
        self.regions
            .get(index)
            .ok_or(EngineError::IndexOutOfRange { index, len })
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Region> {
        let len = self.regions.len();
        self.regions
            .get_mut(index)
            .ok_or(EngineError::IndexOutOfRange { index, len })
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Region> + ExactSizeIterator {
        self.regions.iter()
    }

    /// Pending regions with their store indices, in index order.
    pub fn pending(&self) -> impl Iterator<Item = (usize, &Region)> {
        self.regions.iter().enumerate().filter(|(_, r)| r.is_pending())
    }

    pub fn pending_count(&self) -> usize {
        self.regions.iter().filter(|r| r.is_pending()).count()
    }

    pub fn finalized_count(&self) -> usize {
        self.regions.iter().filter(|r| r.is_finalized()).count()
    }

    /// Apply a label change in place.
    pub fn update(&mut self, index: usize, update: RegionUpdate) -> Result<&Region> {
        let region = self.get_mut(index)?;
        match update {
            RegionUpdate::Attach(label) => region.label = Some(label),
            RegionUpdate::Correct(glyph) => {
                let current = region
                    .label
                    .as_ref()
                    .map(|l| (l.glyph.mzl_number, l.source));
                let label = match current {
                    Some((mzl, _)) if mzl == glyph.mzl_number => None,
                    Some((_, LabelSource::Predicted { confidence })) => Some(Label {
                        glyph,
                        source: LabelSource::Corrected {
                            predicted_confidence: confidence,
                        },
                    }),
                    Some((_, source @ LabelSource::Corrected { .. })) => Some(Label { glyph, source }),
                    _ => Some(Label::manual(glyph)),
                };
                if label.is_some() {
                    region.label = label;
                }
            }
        }
        Ok(region)
    }

    /// Delete the region at `index`; later regions shift down by one.
    pub fn remove(&mut self, index: usize) -> Result<Region> {
        let len = self.regions.len();
        if index >= len {
            return Err(EngineError::IndexOutOfRange { index, len });
        }
        Ok(self.regions.remove(index))
    }

    /// Confirm a region for saving. Finalizing an already finalized region
    /// returns it unchanged.
    pub fn finalize(&mut self, index: usize) -> Result<&Region> {
        let region = self.get_mut(index)?;
        if region.status == RegionStatus::Pending {
            region.status = RegionStatus::Finalized;
        }
        Ok(region)
    }

    pub fn mark_saved(&mut self, index: usize) -> Result<&Region> {
        let region = self.get_mut(index)?;
        region.status = RegionStatus::Saved;
        Ok(region)
    }

    /// Drop every pending region. Finalized and saved regions stay.
    pub fn clear(&mut self) {
        self.regions.retain(|r| !r.is_pending());
    }

    /// Recompute display rectangles after the display ratio changed.
    pub fn rescale(&mut self, ratio: ResizeRatio) {
        for region in &mut self.regions {
            region.display = geometry::to_display(&region.native, ratio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::region::MzlNumber;
    use crate::util::geometry::{DisplayRect, NativeRect};

    fn region(left: u32) -> Region {
        Region::new(
            DisplayRect::new(left as f64, 0.0, 10.0, 10.0),
            NativeRect::new(left, 0, 10, 10),
        )
    }

    fn glyph(n: u32) -> GlyphLabel {
        GlyphLabel::bare(MzlNumber(n))
    }

    #[test]
    fn test_add_returns_index() {
        let mut store = RegionStore::new();
        assert_eq!(store.add(region(0)), 0);
        assert_eq!(store.add(region(10)), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_shifts_display_and_native_together() {
        let mut store = RegionStore::new();
        store.add(region(0));
        store.add(region(10));
        store.add(region(20));

        let removed = store.remove(1).unwrap();
        assert_eq!(removed.native.left, 10);
        assert_eq!(store.len(), 2);

        let c = store.get(1).unwrap();
        assert_eq!(c.native.left, 20);
        assert_eq!(c.display.left, 20.0);
    }

    #[test]
    fn test_stale_index_is_reported() {
        let mut store = RegionStore::new();
        store.add(region(0));
        assert!(matches!(
            store.remove(3),
            Err(EngineError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert!(matches!(
            store.update(1, RegionUpdate::Correct(glyph(1))),
            Err(EngineError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut store = RegionStore::new();
        store.add(region(0));
        store.add(region(10));

        let first = store.finalize(1).unwrap().clone();
        let second = store.finalize(1).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(store.finalized_count(), 1);
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn test_clear_keeps_finalized_regions() {
        let mut store = RegionStore::new();
        store.add(region(0));
        store.add(region(10));
        store.add(region(20));
        store.finalize(1).unwrap();

        store.clear();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().native.left, 10);
    }

    #[test]
    fn test_correcting_a_prediction_marks_it_corrected() {
        let mut store = RegionStore::new();
        store.add(region(0));
        store
            .update(0, RegionUpdate::Attach(Label::predicted(glyph(1), 88.5)))
            .unwrap();

        // Same label: nothing to correct
        let same = store.update(0, RegionUpdate::Correct(glyph(1))).unwrap();
        assert!(!same.label.as_ref().unwrap().is_corrected());

        let corrected = store.update(0, RegionUpdate::Correct(glyph(10))).unwrap();
        let label = corrected.label.as_ref().unwrap();
        assert!(label.is_corrected());
        assert_eq!(label.glyph.mzl_number, MzlNumber(10));
        assert_eq!(
            label.source,
            LabelSource::Corrected {
                predicted_confidence: 88.5
            }
        );

        // Correcting again stays corrected
        let again = store.update(0, RegionUpdate::Correct(glyph(24))).unwrap();
        assert!(again.label.as_ref().unwrap().is_corrected());
    }

    #[test]
    fn test_correcting_unlabeled_region_is_manual() {
        let mut store = RegionStore::new();
        store.add(region(0));
        let updated = store.update(0, RegionUpdate::Correct(glyph(89))).unwrap();
        assert_eq!(updated.label.as_ref().unwrap().source, LabelSource::Manual);
    }

    #[test]
    fn test_rescale_updates_display_rects() {
        let mut store = RegionStore::new();
        store.add(region(20));
        store.rescale(ResizeRatio { w: 2.0, h: 2.0 });
        assert_eq!(store.get(0).unwrap().display, DisplayRect::new(10.0, 0.0, 5.0, 5.0));
    }
}
