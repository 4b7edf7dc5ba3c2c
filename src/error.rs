// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation engine.
//!
//! Collaborator plumbing (files, config, archive) uses `anyhow`; the engine
//! itself reports these typed errors so callers can decide whether a failure
//! skips one region or aborts the operation.

use crate::models::session::Phase;
use crate::util::geometry::NativeRect;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The uploaded bytes are not a decodable image
    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// A native-space rectangle extends past the image edges
    #[error("region {rect} is outside the {image_width}x{image_height} image")]
    OutOfBounds {
        rect: NativeRect,
        image_width: u32,
        image_height: u32,
    },

    /// A region index no longer refers to a live region
    #[error("region index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Zero or negative sized rectangle
    #[error("invalid rectangle: {0}")]
    InvalidRect(String),

    /// The requested action is not allowed in the current phase
    #[error("cannot {action} while {phase:?}")]
    InvalidTransition { phase: Phase, action: &'static str },

    /// The classification collaborator failed for one region
    #[error("classification failed: {0}")]
    Classification(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
