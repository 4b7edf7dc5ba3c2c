// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for images, region snapshots and the glyph archive.

pub mod archive;
pub mod media;
pub mod serialization;
