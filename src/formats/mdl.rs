//! Decoder for the MDL skinned-model format.
//!
//! An MDL file is a chunk region containing one `HEAD` chunk, any number of
//! `MESH` chunks, and optional `SKEL` and `MATL` chunks, in any order. The
//! region is framed first and the header located and version-checked before
//! any other payload is parsed; an incompatible major version is reported as
//! such rather than as a parse failure inside a payload whose layout this
//! decoder does not understand. Cross-references (mesh to material, bone
//! weights to bones) are resolved in a post-pass after all chunks are read,
//! so a mesh chunk may legally precede the material table it references.
//!
//! Decoding is all-or-nothing: any structural failure discards the partial
//! model and surfaces a [`DecodeError`]. Unknown chunks are skipped, which
//! keeps the decoder working against newer format revisions that add
//! optional data.

use cgmath::{Quaternion, Vector3};

use crate::{
    data_structures::{
        bounds::Aabb,
        model::{Bone, BoneWeights, Material, Mesh, Model, Vertex},
        transform::Transform,
    },
    formats::{
        DecodeError, MDL_MAJOR_VERSION, chunk::{self, Chunk}, cursor::Cursor, magic, tags,
    },
};

/// Minor revision this decoder was written against. Newer minors decode with
/// a warning; they only ever add chunks we skip.
const MDL_MINOR_VERSION: u16 = 1;

const NAME_LEN: usize = 32;
const PATH_LEN: usize = 64;

/// Decode an MDL buffer into an immutable [`Model`].
pub fn decode(bytes: &[u8]) -> Result<Model, DecodeError> {
    let chunks = chunk::collect(bytes)?;
    check_head(&chunks, magic::MDL, "MDL", MDL_MAJOR_VERSION, MDL_MINOR_VERSION)?;

    let mut skeleton_chunk: Option<&Chunk> = None;
    let mut meshes: Vec<Mesh> = Vec::new();
    let mut materials: Vec<Material> = Vec::new();

    for chunk in &chunks {
        match chunk.tag {
            tags::HEAD => {}
            tags::SKEL => skeleton_chunk = Some(chunk),
            tags::MESH => meshes.push(read_mesh(chunk)?),
            tags::MATL => materials = read_materials(chunk)?,
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

    let bones = match skeleton_chunk {
        Some(chunk) => read_skeleton(chunk)?,
        None => Vec::new(),
    };

    // Post-pass: only now that every chunk is in do cross-references get
    // checked, so chunk order never matters.
    validate_references(&mut meshes, &materials, bones.len())?;

    let bounds = meshes
        .iter()
        .fold(Aabb::empty(), |acc, m| acc.union(&m.bounds()));

    Ok(Model {
        name: String::new(),
        meshes,
        bones,
        materials,
        bounds,
    })
}

/// Locate the header among the framed chunks and validate its magic and
/// version. Shared by the MDL and WMB decoders; runs before either touches
/// any other payload.
pub(crate) fn check_head(
    chunks: &[Chunk],
    expected_magic: &[u8; 4],
    format: &'static str,
    supported_major: u16,
    known_minor: u16,
) -> Result<(), DecodeError> {
    let head = chunks
        .iter()
        .find(|c| c.tag == tags::HEAD)
        .ok_or_else(|| DecodeError::MalformedChunk {
            tag: tags::HEAD,
            offset: 0,
            reason: "missing header chunk".into(),
        })?;
    let (major, minor) = read_header(head, expected_magic, format)?;
    check_version(format, major, minor, supported_major, known_minor)
}

/// Magic plus major/minor version from a header chunk payload.
fn read_header(
    chunk: &Chunk,
    expected_magic: &[u8; 4],
    format: &'static str,
) -> Result<(u16, u16), DecodeError> {
    let mut cur = chunk.cursor();
    let found = cur.read_bytes(4)?;
    if found != expected_magic {
        return Err(DecodeError::MalformedChunk {
            tag: chunk.tag,
            offset: chunk.offset,
            reason: format!("bad {} magic: {:?}", format, found),
        });
    }
    Ok((cur.read_u16()?, cur.read_u16()?))
}

fn check_version(
    format: &'static str,
    major: u16,
    minor: u16,
    supported_major: u16,
    known_minor: u16,
) -> Result<(), DecodeError> {
    if major != supported_major {
        // A different major means an incompatible layout; best-effort
        // parsing would produce garbage geometry.
        return Err(DecodeError::UnsupportedVersion {
            format,
            major,
            minor,
        });
    }
    if minor > known_minor {
        log::warn!(
            "{} minor version {}.{} is newer than {}.{}; unknown optional chunks will be skipped",
            format,
            major,
            minor,
            supported_major,
            known_minor
        );
    }
    Ok(())
}

fn read_skeleton(chunk: &Chunk) -> Result<Vec<Bone>, DecodeError> {
    let mut cur = chunk.cursor();
    let count = cur.read_u32()? as usize;
    let mut bones = Vec::with_capacity(count.min(1024));
    for index in 0..count {
        let name = cur.read_fixed_str(NAME_LEN)?;
        let parent = cur.read_i32()?;
        let position = Vector3::from(cur.read_vec3()?);
        let rotation = read_quat(&mut cur)?;
        let scale = Vector3::from(cur.read_vec3()?);

        let parent = match parent {
            -1 => None,
            p if p >= 0 && (p as usize) < count => Some(p as usize),
            p => {
                return Err(DecodeError::IndexOutOfRange {
                    index: p as u32,
                    limit: count as u32,
                });
            }
        };
        bones.push(Bone {
            name,
            parent,
            local: Transform {
                position,
                rotation,
                scale,
            },
        });
    }

    validate_forest(&bones)?;
    Ok(bones)
}

/// Walk every bone's parent chain with a visited set; revisiting a bone on
/// the way to a root means the flat parent array encodes a cycle.
fn validate_forest(bones: &[Bone]) -> Result<(), DecodeError> {
    let mut visited = vec![false; bones.len()];
    for start in 0..bones.len() {
        visited.iter_mut().for_each(|v| *v = false);
        let mut current = start;
        loop {
            if visited[current] {
                return Err(DecodeError::CyclicSkeleton { bone: start });
            }
            visited[current] = true;
            match bones[current].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }
    Ok(())
}

fn read_quat(cur: &mut Cursor) -> Result<Quaternion<f32>, DecodeError> {
    let x = cur.read_f32()?;
    let y = cur.read_f32()?;
    let z = cur.read_f32()?;
    let w = cur.read_f32()?;
    Ok(Quaternion::new(w, x, y, z))
}

pub(crate) fn read_mesh(chunk: &Chunk) -> Result<Mesh, DecodeError> {
    let mut cur = chunk.cursor();
    let name = cur.read_fixed_str(NAME_LEN)?;
    let material = cur.read_u32()?;

    let vertex_count = cur.read_u32()? as usize;
    let mut vertices = Vec::with_capacity(vertex_count.min(1 << 16));
    for _ in 0..vertex_count {
        vertices.push(Vertex {
            position: cur.read_vec3()?,
            normal: cur.read_vec3()?,
            tex_coords: cur.read_vec2()?,
        });
    }

    let index_count = cur.read_u32()? as usize;
    if index_count % 3 != 0 {
        return Err(DecodeError::MalformedChunk {
            tag: chunk.tag,
            offset: chunk.offset,
            reason: format!("index count {} is not a multiple of 3", index_count),
        });
    }
    let mut indices = Vec::with_capacity(index_count.min(1 << 18));
    for _ in 0..index_count {
        indices.push(cur.read_u32()?);
    }

    let weights = match cur.read_u32()? {
        0 => None,
        1 => {
            let mut weights = Vec::with_capacity(vertex_count.min(1 << 16));
            for _ in 0..vertex_count {
                let mut set = BoneWeights {
                    indices: [0; 4],
                    weights: [0.0; 4],
                };
                for slot in &mut set.indices {
                    *slot = cur.read_u16()?;
                }
                for slot in &mut set.weights {
                    *slot = cur.read_f32()?;
                }
                normalize_weights(&mut set, &name);
                weights.push(set);
            }
            Some(weights)
        }
        other => {
            return Err(DecodeError::MalformedChunk {
                tag: chunk.tag,
                offset: chunk.offset,
                reason: format!("bad bone-weight flag {}", other),
            });
        }
    };

    Ok(Mesh {
        name,
        vertices,
        indices,
        material,
        weights,
    })
}

fn normalize_weights(set: &mut BoneWeights, mesh: &str) {
    let sum: f32 = set.weights.iter().sum();
    if sum > f32::EPSILON {
        for w in &mut set.weights {
            *w /= sum;
        }
    } else {
        log::warn!("mesh '{}' has a vertex with zero total bone weight", mesh);
    }
}

pub(crate) fn read_materials(chunk: &Chunk) -> Result<Vec<Material>, DecodeError> {
    let mut cur = chunk.cursor();
    let count = cur.read_u32()? as usize;
    let mut materials = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        materials.push(Material {
            name: cur.read_fixed_str(NAME_LEN)?,
            texture: cur.read_fixed_str(PATH_LEN)?,
            flags: cur.read_u32()?,
        });
    }
    Ok(materials)
}

/// The cross-reference post-pass: triangle indices against the vertex count,
/// bone-weight indices against the bone count, and material references
/// against the material table.
pub(crate) fn validate_references(
    meshes: &mut [Mesh],
    materials: &[Material],
    bone_count: usize,
) -> Result<(), DecodeError> {
    for (mesh_index, mesh) in meshes.iter().enumerate() {
        let vertex_count = mesh.vertices.len() as u32;
        for &index in &mesh.indices {
            if index >= vertex_count {
                return Err(DecodeError::IndexOutOfRange {
                    index,
                    limit: vertex_count,
                });
            }
        }

        if let Some(weights) = &mesh.weights {
            if weights.len() != mesh.vertices.len() {
                return Err(DecodeError::IndexOutOfRange {
                    index: weights.len() as u32,
                    limit: mesh.vertices.len() as u32,
                });
            }
            for set in weights {
                for (slot, &bone) in set.indices.iter().enumerate() {
                    // Slots with zero weight are padding and may carry any
                    // index the exporter left behind.
                    if set.weights[slot] > 0.0 && bone as usize >= bone_count {
                        return Err(DecodeError::IndexOutOfRange {
                            index: bone as u32,
                            limit: bone_count as u32,
                        });
                    }
                }
            }
        }

        if mesh.material as usize >= materials.len() {
            return Err(DecodeError::DanglingMaterialRef {
                mesh: mesh_index,
                material: mesh.material,
                table_len: materials.len(),
            });
        }
    }
    Ok(())
}
