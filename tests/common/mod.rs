//! Byte-level fixture builders shared by the decoder tests.

#![allow(dead_code)]

use ackview::formats::{ChunkTag, MDL_MAJOR_VERSION, WMB_MAJOR_VERSION, magic, tags};

/// Frame a payload as one chunk: tag, little-endian length, payload.
pub fn chunk(tag: ChunkTag, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&tag.0);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn head(magic: &[u8; 4], major: u16, minor: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(magic);
    payload.extend_from_slice(&major.to_le_bytes());
    payload.extend_from_slice(&minor.to_le_bytes());
    chunk(tags::HEAD, &payload)
}

pub fn mdl_head() -> Vec<u8> {
    head(magic::MDL, MDL_MAJOR_VERSION, 0)
}

pub fn wmb_head() -> Vec<u8> {
    head(magic::WMB, WMB_MAJOR_VERSION, 0)
}

/// A zero-padded fixed-width string field.
pub fn fixed_str(s: &str, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    out[..s.len()].copy_from_slice(s.as_bytes());
    out
}

pub fn push_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// A mesh payload. Each vertex is position, normal, uv packed as 8 floats.
pub fn mesh_payload(
    name: &str,
    material: u32,
    vertices: &[[f32; 8]],
    indices: &[u32],
    weights: Option<&[([u16; 4], [f32; 4])]>,
) -> Vec<u8> {
    let mut out = fixed_str(name, 32);
    out.extend_from_slice(&material.to_le_bytes());
    out.extend_from_slice(&(vertices.len() as u32).to_le_bytes());
    for v in vertices {
        push_f32s(&mut out, v);
    }
    out.extend_from_slice(&(indices.len() as u32).to_le_bytes());
    for i in indices {
        out.extend_from_slice(&i.to_le_bytes());
    }
    match weights {
        None => out.extend_from_slice(&0u32.to_le_bytes()),
        Some(sets) => {
            out.extend_from_slice(&1u32.to_le_bytes());
            for (bone_indices, bone_weights) in sets {
                for i in bone_indices {
                    out.extend_from_slice(&i.to_le_bytes());
                }
                push_f32s(&mut out, bone_weights);
            }
        }
    }
    out
}

pub fn materials_payload(entries: &[(&str, &str, u32)]) -> Vec<u8> {
    let mut out = (entries.len() as u32).to_le_bytes().to_vec();
    for (name, texture, flags) in entries {
        out.extend(fixed_str(name, 32));
        out.extend(fixed_str(texture, 64));
        out.extend_from_slice(&flags.to_le_bytes());
    }
    out
}

/// A bone record at the identity bind transform.
pub fn bone_record(name: &str, parent: i32) -> Vec<u8> {
    let mut out = fixed_str(name, 32);
    out.extend_from_slice(&parent.to_le_bytes());
    push_f32s(&mut out, &[0.0, 0.0, 0.0]); // position
    push_f32s(&mut out, &[0.0, 0.0, 0.0, 1.0]); // quaternion xyzw
    push_f32s(&mut out, &[1.0, 1.0, 1.0]); // scale
    out
}

pub fn skeleton_payload(bones: &[(&str, i32)]) -> Vec<u8> {
    let mut out = (bones.len() as u32).to_le_bytes().to_vec();
    for (name, parent) in bones {
        out.extend(bone_record(name, *parent));
    }
    out
}

pub fn placement_record(
    type_id: u32,
    name: &str,
    path: &str,
    position: [f32; 3],
    angles: [f32; 3],
    scale: [f32; 3],
    properties: &[(&str, &str)],
) -> Vec<u8> {
    let mut out = type_id.to_le_bytes().to_vec();
    out.extend(fixed_str(name, 32));
    out.extend(fixed_str(path, 64));
    push_f32s(&mut out, &position);
    push_f32s(&mut out, &angles);
    push_f32s(&mut out, &scale);
    out.extend_from_slice(&(properties.len() as u32).to_le_bytes());
    for (key, value) in properties {
        out.extend_from_slice(&(key.len() as u16).to_le_bytes());
        out.extend_from_slice(key.as_bytes());
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
        out.extend_from_slice(value.as_bytes());
    }
    out
}

pub fn placements_payload(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = (records.len() as u32).to_le_bytes().to_vec();
    for record in records {
        out.extend_from_slice(record);
    }
    out
}

/// Three vertices forming a triangle in the xy plane at the origin.
pub fn triangle_vertices() -> Vec<[f32; 8]> {
    vec![
        [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        [10.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0],
        [0.0, 5.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0],
    ]
}

/// A minimal valid model file: header, one material, one triangle mesh.
pub fn simple_mdl() -> Vec<u8> {
    let mut bytes = mdl_head();
    bytes.extend(chunk(
        tags::MATL,
        &materials_payload(&[("skin", "skin.png", 0)]),
    ));
    bytes.extend(chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1, 2], None),
    ));
    bytes
}

/// A minimal valid level file: header, one material, one static mesh.
pub fn simple_wmb() -> Vec<u8> {
    let mut bytes = wmb_head();
    bytes.extend(chunk(
        tags::MATL,
        &materials_payload(&[("wall", "wall.png", 0)]),
    ));
    bytes.extend(chunk(
        tags::GEOM,
        &mesh_payload("world", 0, &triangle_vertices(), &[0, 1, 2], None),
    ));
    bytes
}
