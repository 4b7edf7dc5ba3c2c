// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Exportable snapshot of the regions drawn on one image.

use super::region::Region;
use super::session::AnnotationSession;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    /// Path of the native image the regions belong to
    pub image_path: String,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default)]
    pub regions: Vec<Region>,
}

impl RegionSnapshot {
    /// Capture the current image of `session`, `None` before an upload.
    pub fn capture(session: &AnnotationSession, image_path: String) -> Option<Self> {
        let manager = session.manager()?;
        let (image_width, image_height) = manager.dimensions();
        Some(Self {
            image_path,
            image_width,
            image_height,
            regions: manager.regions().iter().cloned().collect(),
        })
    }

    /// Whether the snapshot was taken on an image of this size.
    pub fn matches_dimensions(&self, (width, height): (u32, u32)) -> bool {
        self.image_width == width && self.image_height == height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayBounds;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_capture_requires_image() {
        let session = AnnotationSession::new(DisplayBounds::default());
        assert!(RegionSnapshot::capture(&session, "a.png".to_string()).is_none());
    }

    #[test]
    fn test_capture_keeps_native_geometry() {
        let mut session = AnnotationSession::new(DisplayBounds {
            max_width: 100,
            max_height: 100,
        });
        session.upload("a.png", &png(400, 200)).unwrap();
        session
            .draw(crate::util::geometry::DisplayRect::new(10.0, 10.0, 20.0, 20.0))
            .unwrap();

        let snapshot = RegionSnapshot::capture(&session, "/tmp/a.png".to_string()).unwrap();
        assert_eq!((snapshot.image_width, snapshot.image_height), (400, 200));
        assert_eq!(snapshot.regions.len(), 1);
        assert_eq!(snapshot.regions[0].native.to_bbox(), [40, 40, 120, 120]);
        assert!(snapshot.matches_dimensions((400, 200)));
        assert!(!snapshot.matches_dimensions((200, 400)));
    }
}
