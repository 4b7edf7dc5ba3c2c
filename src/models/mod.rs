// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation engine: regions, the image they belong to, and the workflow
//! session driving them.

pub mod image_manager;
pub mod region;
pub mod region_store;
pub mod session;
pub mod snapshot;
