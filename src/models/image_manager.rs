// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! One image bound to its regions and its display ratio.

use super::region::Region;
use super::region_store::RegionStore;
use crate::error::Result;
use crate::io::media;
use crate::util::geometry::{self, DisplayRect, NativeRect, ResizeRatio};
use image::{imageops::FilterType, DynamicImage};

/// A cropped region with its current label (empty when unlabeled).
#[derive(Debug, Clone)]
pub struct GlyphCrop {
    pub index: usize,
    pub image: DynamicImage,
    pub label: String,
}

pub struct ImageManager {
    image: DynamicImage,
    ratio: ResizeRatio,
    display_size: (u32, u32),
    regions: RegionStore,
}

impl ImageManager {
    pub fn new(image: DynamicImage) -> Self {
        let display_size = (image.width(), image.height());
        Self {
            image,
            ratio: ResizeRatio::IDENTITY,
            display_size,
            regions: RegionStore::new(),
        }
    }

    /// Decode an upload. Fails with a decode error for non-image bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(media::decode(bytes)?))
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    pub fn ratio(&self) -> ResizeRatio {
        self.ratio
    }

    /// Size of the display copy produced by the last resize.
    pub fn display_size(&self) -> (u32, u32) {
        self.display_size
    }

    pub fn regions(&self) -> &RegionStore {
        &self.regions
    }

    pub fn regions_mut(&mut self) -> &mut RegionStore {
        &mut self.regions
    }

    /// Produce the display copy and record the ratio it implies.
    ///
    /// Calling this again recomputes everything from the native image;
    /// display rectangles of existing regions follow the new ratio.
    pub fn resize_for_display(&mut self, max_height: u32, max_width: u32) -> DynamicImage {
        let native = self.dimensions();
        let display = geometry::fit_within(native, max_width, max_height);
        self.ratio = ResizeRatio::between(native, display);
        self.display_size = display;
        self.regions.rescale(self.ratio);

        log::debug!(
            "Display size {}x{} for {}x{} image (ratio {:.3}, {:.3})",
            display.0,
            display.1,
            native.0,
            native.1,
            self.ratio.w,
            self.ratio.h
        );

        if display == native {
            self.image.clone()
        } else {
            self.image
                .resize_exact(display.0, display.1, FilterType::CatmullRom)
        }
    }

    /// Add a region drawn on the display copy.
    ///
    /// The rectangle must already be clamped to the display image; one that
    /// lands outside the native image is rejected, never adjusted.
    pub fn add_display_region(&mut self, rect: DisplayRect) -> Result<usize> {
        let native = geometry::to_native(&rect, self.ratio);
        let (width, height) = self.dimensions();
        native.validate(width, height)?;
        Ok(self.regions.add(Region::new(rect, native)))
    }

    /// Add a region known in native coordinates (e.g. from an imported file).
    pub fn add_native_region(&mut self, native: NativeRect) -> Result<usize> {
        let (width, height) = self.dimensions();
        native.validate(width, height)?;
        let display = geometry::to_display(&native, self.ratio);
        Ok(self.regions.add(Region::new(display, native)))
    }

    /// Crop the native pixels under region `index`.
    pub fn crop_region(&self, index: usize) -> Result<GlyphCrop> {
        let region = self.regions.get(index)?;
        let image = geometry::crop(&self.image, &region.native)?;
        Ok(GlyphCrop {
            index,
            image,
            label: region.label_text(),
        })
    }

    /// One crop per pending region, in index order, produced on demand.
    pub fn preview_all(&self) -> impl Iterator<Item = Result<GlyphCrop>> + '_ {
        self.regions
            .pending()
            .map(move |(index, _)| self.crop_region(index))
    }

    /// Bounding box of the whole image, `[0, 0, width, height]`.
    pub fn bbox_img(&self) -> [u32; 4] {
        let (width, height) = self.dimensions();
        NativeRect::full(width, height).to_bbox()
    }
}
