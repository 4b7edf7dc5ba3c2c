// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the coordinate transformations between display space
//! (the scaled-down copy shown on the canvas) and native space (the original
//! full-resolution image), plus the resize policy and cropping.

use crate::error::{EngineError, Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Float noise tolerated when truncating scaled coordinates.
const TRUNCATION_EPSILON: f64 = 1e-6;

/// Ratio between native and display dimensions, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeRatio {
    pub w: f64,
    pub h: f64,
}

impl Default for ResizeRatio {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ResizeRatio {
    pub const IDENTITY: ResizeRatio = ResizeRatio { w: 1.0, h: 1.0 };

    /// Ratio of a native size to the display size derived from it.
    pub fn between(native: (u32, u32), display: (u32, u32)) -> Self {
        Self {
            w: native.0 as f64 / display.0.max(1) as f64,
            h: native.1 as f64 / display.1.max(1) as f64,
        }
    }
}

/// A rectangle in display space (canvas pixels, fractional).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Build a rectangle from two opposite corners given in any order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        let left = a.0.min(b.0);
        let top = a.1.min(b.1);
        Self::new(left, top, (a.0 - b.0).abs(), (a.1 - b.1).abs())
    }

    /// Clip the rectangle to a `width` x `height` canvas.
    ///
    /// This is the caller-side clamp: it runs on what the user drew, before
    /// the rectangle reaches the engine, so the stored region and the visible
    /// one never diverge.
    pub fn clamp_to(&self, width: f64, height: f64) -> Self {
        let left = self.left.clamp(0.0, width);
        let top = self.top.clamp(0.0, height);
        let right = (self.left + self.width).clamp(0.0, width);
        let bottom = (self.top + self.height).clamp(0.0, height);
        Self::new(left, top, right - left, bottom - top)
    }
}

/// A rectangle in native space (original image pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl NativeRect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The rectangle covering a whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(&self) -> u64 {
        self.left as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.top as u64 + self.height as u64
    }

    /// Corner form `[x_min, y_min, x_max, y_max]` used by persistence payloads.
    pub fn to_bbox(&self) -> [u32; 4] {
        [
            self.left,
            self.top,
            self.left.saturating_add(self.width),
            self.top.saturating_add(self.height),
        ]
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width as u64 && self.bottom() <= height as u64
    }

    /// Check the region invariant: non-empty and inside the image.
    pub fn validate(&self, width: u32, height: u32) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidRect(format!("{self} has zero size")));
        }
        if !self.fits_within(width, height) {
            return Err(EngineError::OutOfBounds {
                rect: *self,
                image_width: width,
                image_height: height,
            });
        }
        Ok(())
    }
}

impl fmt::Display for NativeRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.left, self.top, self.width, self.height
        )
    }
}

/// Map a native rectangle into display space.
pub fn to_display(rect: &NativeRect, ratio: ResizeRatio) -> DisplayRect {
    DisplayRect {
        left: rect.left as f64 / ratio.w,
        top: rect.top as f64 / ratio.h,
        width: rect.width as f64 / ratio.w,
        height: rect.height as f64 / ratio.h,
    }
}

/// Map a display rectangle into native space, truncating to whole pixels.
pub fn to_native(rect: &DisplayRect, ratio: ResizeRatio) -> NativeRect {
    let truncate = |v: f64| (v + TRUNCATION_EPSILON).floor().max(0.0) as u32;
    NativeRect {
        left: truncate(rect.left * ratio.w),
        top: truncate(rect.top * ratio.h),
        width: truncate(rect.width * ratio.w),
        height: truncate(rect.height * ratio.h),
    }
}

/// Extract the pixels under `rect`. Never clamps: a rectangle reaching past
/// the image edge is an error.
pub fn crop(image: &DynamicImage, rect: &NativeRect) -> Result<DynamicImage> {
    rect.validate(image.width(), image.height())?;
    Ok(image.crop_imm(rect.left, rect.top, rect.width, rect.height))
}

/// Display size for a native image under `max_width` x `max_height`.
///
/// Shrinks to fit the height first, then shrinks the result again if it is
/// still too wide. Each pass measures the output of the previous one and
/// truncates to whole pixels. Never upscales.
pub fn fit_within(native: (u32, u32), max_width: u32, max_height: u32) -> (u32, u32) {
    let (mut width, mut height) = native;
    if height > max_height {
        let ratio = max_height as f64 / height as f64;
        width = (width as f64 * ratio) as u32;
        height = (height as f64 * ratio) as u32;
    }
    if width > max_width {
        let ratio = max_width as f64 / width as f64;
        width = (width as f64 * ratio) as u32;
        height = (height as f64 * ratio) as u32;
    }
    (width.max(1), height.max(1))
}
