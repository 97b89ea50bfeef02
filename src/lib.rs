//! ackview
//!
//! Inspection tools for the proprietary binary formats of a classic game
//! engine: skinned `.mdl` models and `.wmb`/`.wdl` levels. The crate decodes
//! both formats from their chunked container framing into immutable
//! CPU-side data, assembles render scenes from them, and ships a small wgpu
//! viewer for browsing an install directory.
//!
//! High-level modules
//! - `formats`: chunk container framing plus the `.mdl` and `.wmb` decoders
//! - `data_structures`: decoded asset data (models, levels, bounds, poses)
//! - `scene`: per-frame assembly of decoded assets into a flat draw list
//! - `resources`: filesystem loading, texture sets, model resolution
//! - `camera`: fly camera, projection, and frustum culling
//! - `pipelines`: render pipeline definitions
//! - `viewer`: the interactive window and render loop
//!

pub mod camera;
pub mod data_structures;
pub mod formats;
pub mod pipelines;
pub mod resources;
pub mod scene;
pub mod viewer;

// Re-exports commonly used types for convenience in downstream code.
pub use formats::{DecodeError, DecodeWarning, mdl, wmb};
pub use scene::{Asset, RenderScene, assemble};
