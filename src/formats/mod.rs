//! Binary asset format decoding.
//!
//! Both asset formats handled by this crate share a common on-disk shape: a
//! four byte magic plus version, followed by a flat sequence of tagged,
//! length-prefixed chunks. This module contains the shared plumbing and the
//! two format decoders:
//!
//! - `cursor` is a bounds-checked little-endian reader over a byte buffer
//! - `chunk` is the tag/length framing layer shared by MDL and WMB
//! - `mdl` decodes skinned models (meshes, skeleton, materials)
//! - `wmb` decodes levels (static geometry, entity placements)
//!
//! Tag and version constants live here so a corrected reverse-engineering of
//! the formats only ever touches this file, never the decode logic.

use std::fmt;

use thiserror::Error;

pub mod chunk;
pub mod cursor;
pub mod mdl;
pub mod wmb;

/// A four byte chunk identifier, printed as ASCII where possible.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkTag(pub [u8; 4]);

impl ChunkTag {
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkTag({})", self)
    }
}

/// Chunk tags shared by both container formats.
pub mod tags {
    use super::ChunkTag;

    /// Magic + version header. Required, position-independent.
    pub const HEAD: ChunkTag = ChunkTag::new(b"HEAD");
    /// Material table.
    pub const MATL: ChunkTag = ChunkTag::new(b"MATL");
    /// Skinned or static mesh (MDL). Repeats, one chunk per mesh.
    pub const MESH: ChunkTag = ChunkTag::new(b"MESH");
    /// Bone table with bind-pose transforms (MDL).
    pub const SKEL: ChunkTag = ChunkTag::new(b"SKEL");
    /// Static world geometry (WMB). Repeats, one chunk per mesh.
    pub const GEOM: ChunkTag = ChunkTag::new(b"GEOM");
    /// Entity placement records (WMB).
    pub const ENTY: ChunkTag = ChunkTag::new(b"ENTY");
}

/// File magics carried inside the `HEAD` chunk.
pub mod magic {
    pub const MDL: &[u8; 4] = b"MDL\0";
    pub const WMB: &[u8; 4] = b"WMB\0";
}

/// Major format revisions this crate understands. Newer minor revisions are
/// accepted and logged; a different major aborts the decode.
pub const MDL_MAJOR_VERSION: u16 = 3;
pub const WMB_MAJOR_VERSION: u16 = 7;

/// A structural failure while decoding an asset buffer.
///
/// Any of these aborts the decode of the affected asset; the partial result
/// is discarded. Offsets are absolute positions in the input buffer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("truncated data at offset {offset}: wanted {wanted} byte(s), {available} left")]
    TruncatedData {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    #[error("seek target {offset} is beyond the end of the buffer ({len} bytes)")]
    OutOfRange { offset: usize, len: usize },

    #[error("malformed chunk '{tag}' at offset {offset}: {reason}")]
    MalformedChunk {
        tag: ChunkTag,
        offset: usize,
        reason: String,
    },

    #[error("unsupported {format} version {major}.{minor}")]
    UnsupportedVersion {
        format: &'static str,
        major: u16,
        minor: u16,
    },

    #[error("skeleton parent chain of bone {bone} loops back on itself")]
    CyclicSkeleton { bone: usize },

    #[error("index {index} is out of range (limit {limit})")]
    IndexOutOfRange { index: u32, limit: u32 },

    #[error("mesh {mesh} references material {material}, but only {table_len} materials exist")]
    DanglingMaterialRef {
        mesh: usize,
        material: u32,
        table_len: usize,
    },
}

/// A recoverable oddity found while decoding. Warnings are accumulated and
/// returned alongside a best-effort result, never thrown.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeWarning {
    /// A placement references a model the resolver could not supply. The
    /// placement is kept with no mesh attached.
    UnresolvedReference { placement: usize, path: String },
    /// A referenced resource file failed to load; a placeholder stands in
    /// for it.
    LoadError { path: String, reason: String },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::UnresolvedReference { placement, path } => write!(
                f,
                "placement {} references unresolvable model '{}'",
                placement, path
            ),
            DecodeWarning::LoadError { path, reason } => {
                write!(f, "resource '{}' failed to load: {}", path, reason)
            }
        }
    }
}
