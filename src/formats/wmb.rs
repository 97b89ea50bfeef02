//! Decoder for the WMB level format (also served with a `.wdl` extension;
//! the payload is the same).
//!
//! A WMB file is a chunk region containing a `HEAD` chunk, any number of
//! `GEOM` static-geometry chunks, an optional `MATL` material table and an
//! optional `ENTY` entity-placement chunk, in any order. Structure and
//! validation mirror the MDL decoder; the mesh payload layout is shared, and
//! the header is located and version-checked before any other payload is
//! parsed.
//!
//! Model references in entity placements are resolved eagerly through the
//! injected [`ModelResolver`]. A reference the resolver cannot supply is a
//! warning, not an error: one missing dependent asset must never block
//! viewing the rest of a level.

use std::sync::Arc;

use cgmath::Vector3;

use crate::{
    data_structures::{
        bounds::Aabb,
        level::{EntityPlacement, Level},
        model::Model,
        transform::Transform,
    },
    formats::{
        DecodeError, DecodeWarning, WMB_MAJOR_VERSION,
        chunk::{self, Chunk},
        cursor::Cursor,
        magic,
        mdl::{check_head, read_materials, read_mesh, validate_references},
        tags,
    },
};

/// Minor revision this decoder was written against.
const WMB_MINOR_VERSION: u16 = 0;

const NAME_LEN: usize = 32;
const PATH_LEN: usize = 64;

/// Maps a model path from an entity placement to a previously decoded model.
///
/// Injected into [`decode`] so the decoder never touches the filesystem
/// itself; tests supply an in-memory implementation.
pub trait ModelResolver {
    fn resolve(&self, path: &str) -> Option<Arc<Model>>;
}

/// A resolver that knows no models. Every reference becomes a warning.
pub struct NullResolver;

impl ModelResolver for NullResolver {
    fn resolve(&self, _path: &str) -> Option<Arc<Model>> {
        None
    }
}

/// A decoded level plus the non-fatal warnings accumulated along the way.
pub struct LevelDecode {
    pub level: Level,
    pub warnings: Vec<DecodeWarning>,
}

/// Decode a WMB buffer. Structural failures abort with a [`DecodeError`];
/// unresolved model references are returned as warnings alongside the level.
pub fn decode(bytes: &[u8], resolver: &dyn ModelResolver) -> Result<LevelDecode, DecodeError> {
    let chunks = chunk::collect(bytes)?;
    check_head(&chunks, magic::WMB, "WMB", WMB_MAJOR_VERSION, WMB_MINOR_VERSION)?;

    let mut meshes = Vec::new();
    let mut materials = Vec::new();
    let mut entity_chunk: Option<&Chunk> = None;

    for chunk in &chunks {
        match chunk.tag {
            tags::HEAD => {}
            tags::GEOM => {
                let mesh = read_mesh(chunk)?;
                if mesh.weights.is_some() {
                    return Err(DecodeError::MalformedChunk {
                        tag: chunk.tag,
                        offset: chunk.offset,
                        reason: "static world geometry cannot carry bone weights".into(),
                    });
                }
                meshes.push(mesh);
            }
            tags::MATL => materials = read_materials(chunk)?,
            tags::ENTY => entity_chunk = Some(chunk),
            other => {
                log::debug!(
                    "skipping unknown chunk '{}' ({} bytes) at offset {}",
                    other,
                    chunk.payload().len(),
                    chunk.offset
                );
            }
        }
    }

    validate_references(&mut meshes, &materials, 0)?;

    let mut placements = match entity_chunk {
        Some(chunk) => read_placements(chunk)?,
        None => Vec::new(),
    };

    let mut warnings = Vec::new();
    for (index, placement) in placements.iter_mut().enumerate() {
        let Some(path) = &placement.model_path else {
            continue;
        };
        match resolver.resolve(path) {
            Some(model) => placement.model = Some(model),
            None => {
                log::warn!("placement {} references unresolvable model '{}'", index, path);
                warnings.push(DecodeWarning::UnresolvedReference {
                    placement: index,
                    path: path.clone(),
                });
            }
        }
    }

    // Only geometry that actually resolved contributes to the bounds.
    let static_bounds = meshes
        .iter()
        .fold(Aabb::empty(), |acc, m| acc.union(&m.bounds()));
    let bounds = placements
        .iter()
        .fold(static_bounds, |acc, p| acc.union(&p.bounds()));

    Ok(LevelDecode {
        level: Level {
            name: String::new(),
            meshes,
            materials,
            placements,
            bounds,
        },
        warnings,
    })
}

fn read_placements(chunk: &Chunk) -> Result<Vec<EntityPlacement>, DecodeError> {
    let mut cur = chunk.cursor();
    let count = cur.read_u32()? as usize;
    let mut placements = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        let type_id = cur.read_u32()?;
        let name = cur.read_fixed_str(NAME_LEN)?;
        let path = cur.read_fixed_str(PATH_LEN)?;
        let position = Vector3::from(cur.read_vec3()?);
        let angles = cur.read_vec3()?;
        let scale = Vector3::from(cur.read_vec3()?);
        let properties = read_properties(&mut cur)?;

        placements.push(EntityPlacement {
            type_id,
            name,
            transform: Transform::from_euler_deg(position, angles, scale),
            model_path: (!path.is_empty()).then_some(path),
            model: None,
            properties,
        });
    }
    Ok(placements)
}

/// Key/value property strings, each length-prefixed. The values are opaque
/// to the viewer; they are carried for inspection only.
fn read_properties(cur: &mut Cursor) -> Result<Vec<(String, String)>, DecodeError> {
    let count = cur.read_u32()? as usize;
    let mut properties = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        let key_len = cur.read_u16()? as usize;
        let key = String::from_utf8_lossy(cur.read_bytes(key_len)?).into_owned();
        let value_len = cur.read_u16()? as usize;
        let value = String::from_utf8_lossy(cur.read_bytes(value_len)?).into_owned();
        properties.push((key, value));
    }
    Ok(properties)
}
