//! Core data types for decoded assets and scene representation.
//!
//! This module contains the in-memory shapes the decoders produce and the
//! viewer consumes:
//!
//! - `model` contains mesh, skeleton and material definitions for MDL models
//! - `level` contains static world geometry and entity placements for WMB levels
//! - `transform` holds decomposed position/rotation/scale transforms
//! - `bounds` provides axis-aligned bounding boxes
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod bounds;
pub mod level;
pub mod model;
pub mod texture;
pub mod transform;
