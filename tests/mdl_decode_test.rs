mod common;

use ackview::formats::{ChunkTag, DecodeError, MDL_MAJOR_VERSION, magic, mdl, tags};
use cgmath::Vector3;
use common::*;

#[test]
fn decodes_a_simple_model() {
    let model = mdl::decode(&simple_mdl()).unwrap();

    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.meshes[0].name, "body");
    assert_eq!(model.meshes[0].vertices.len(), 3);
    assert_eq!(model.meshes[0].indices, vec![0, 1, 2]);
    assert!(model.meshes[0].weights.is_none());
    assert!(model.bones.is_empty());
    assert_eq!(model.materials.len(), 1);
    assert_eq!(model.materials[0].texture, "skin.png");

    assert_eq!(model.bounds.min, Vector3::new(0.0, 0.0, 0.0));
    assert_eq!(model.bounds.max, Vector3::new(10.0, 5.0, 0.0));
}

#[test]
fn chunk_order_does_not_matter() {
    let matl = chunk(tags::MATL, &materials_payload(&[("skin", "skin.png", 0)]));
    let mesh = chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1, 2], None),
    );

    // Mesh before the material table it references, header last.
    let mut reordered = mesh.clone();
    reordered.extend_from_slice(&matl);
    reordered.extend_from_slice(&mdl_head());

    let expected = mdl::decode(&simple_mdl()).unwrap();
    let actual = mdl::decode(&reordered).unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn unknown_chunks_are_skipped() {
    let mut bytes = mdl_head();
    bytes.extend(chunk(ChunkTag::new(b"XTRA"), &[0xde, 0xad, 0xbe, 0xef]));
    bytes.extend(chunk(
        tags::MATL,
        &materials_payload(&[("skin", "skin.png", 0)]),
    ));
    bytes.extend(chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1, 2], None),
    ));

    let model = mdl::decode(&bytes).unwrap();
    assert_eq!(model.meshes.len(), 1);
}

#[test]
fn missing_header_is_rejected() {
    let bytes = chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1, 2], None),
    );
    assert!(matches!(
        mdl::decode(&bytes),
        Err(DecodeError::MalformedChunk { tag, .. }) if tag == tags::HEAD
    ));
}

#[test]
fn wrong_magic_is_rejected() {
    let bytes = head(magic::WMB, MDL_MAJOR_VERSION, 0);
    assert!(matches!(
        mdl::decode(&bytes),
        Err(DecodeError::MalformedChunk { .. })
    ));
}

#[test]
fn newer_major_version_is_rejected() {
    let bytes = head(magic::MDL, MDL_MAJOR_VERSION + 1, 0);
    assert!(matches!(
        mdl::decode(&bytes),
        Err(DecodeError::UnsupportedVersion { format: "MDL", .. })
    ));
}

#[test]
fn version_is_checked_before_any_payload_is_parsed() {
    // An incompatible major may lay out mesh payloads differently, so the
    // version error must win over whatever parsing that payload would fail
    // with.
    let mut bytes = head(magic::MDL, MDL_MAJOR_VERSION + 1, 0);
    bytes.extend(chunk(tags::MESH, &[0u8; 4]));

    assert!(matches!(
        mdl::decode(&bytes),
        Err(DecodeError::UnsupportedVersion { format: "MDL", major, .. })
            if major == MDL_MAJOR_VERSION + 1
    ));
}

#[test]
fn triangle_index_equal_to_vertex_count_is_rejected() {
    let mut bytes = mdl_head();
    bytes.extend(chunk(
        tags::MATL,
        &materials_payload(&[("skin", "skin.png", 0)]),
    ));
    bytes.extend(chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1, 3], None),
    ));

    assert_eq!(
        mdl::decode(&bytes),
        Err(DecodeError::IndexOutOfRange { index: 3, limit: 3 })
    );
}

#[test]
fn index_count_must_be_triangles() {
    let mut bytes = mdl_head();
    bytes.extend(chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1], None),
    ));
    assert!(matches!(
        mdl::decode(&bytes),
        Err(DecodeError::MalformedChunk { tag, .. }) if tag == tags::MESH
    ));
}

#[test]
fn dangling_material_reference_is_rejected() {
    let mut bytes = mdl_head();
    bytes.extend(chunk(
        tags::MATL,
        &materials_payload(&[("skin", "skin.png", 0)]),
    ));
    bytes.extend(chunk(
        tags::MESH,
        &mesh_payload("body", 2, &triangle_vertices(), &[0, 1, 2], None),
    ));

    assert_eq!(
        mdl::decode(&bytes),
        Err(DecodeError::DanglingMaterialRef {
            mesh: 0,
            material: 2,
            table_len: 1,
        })
    );
}

#[test]
fn skeleton_decodes_with_parents() {
    let mut bytes = mdl_head();
    bytes.extend(chunk(
        tags::SKEL,
        &skeleton_payload(&[("root", -1), ("spine", 0), ("head", 1)]),
    ));
    bytes.extend(chunk(
        tags::MATL,
        &materials_payload(&[("skin", "skin.png", 0)]),
    ));
    bytes.extend(chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1, 2], None),
    ));

    let model = mdl::decode(&bytes).unwrap();
    assert_eq!(model.bones.len(), 3);
    assert_eq!(model.bones[0].parent, None);
    assert_eq!(model.bones[1].parent, Some(0));
    assert_eq!(model.bones[2].parent, Some(1));
    assert_eq!(model.bones[2].name, "head");
}

#[test]
fn cyclic_skeleton_is_rejected() {
    let mut bytes = mdl_head();
    // Bones 1 and 2 are each other's parent.
    bytes.extend(chunk(
        tags::SKEL,
        &skeleton_payload(&[("root", -1), ("a", 2), ("b", 1)]),
    ));

    assert_eq!(
        mdl::decode(&bytes),
        Err(DecodeError::CyclicSkeleton { bone: 1 })
    );
}

#[test]
fn bone_parent_out_of_range_is_rejected() {
    let mut bytes = mdl_head();
    bytes.extend(chunk(tags::SKEL, &skeleton_payload(&[("root", 5)])));
    assert!(matches!(
        mdl::decode(&bytes),
        Err(DecodeError::IndexOutOfRange { index: 5, .. })
    ));
}

#[test]
fn bone_weights_are_normalized() {
    let weights = [
        ([0u16, 1, 0, 0], [2.0f32, 2.0, 0.0, 0.0]),
        ([0, 0, 0, 0], [1.0, 0.0, 0.0, 0.0]),
        ([1, 0, 0, 0], [0.25, 0.0, 0.0, 0.0]),
    ];
    let mut bytes = mdl_head();
    bytes.extend(chunk(
        tags::SKEL,
        &skeleton_payload(&[("root", -1), ("tip", 0)]),
    ));
    bytes.extend(chunk(
        tags::MATL,
        &materials_payload(&[("skin", "skin.png", 0)]),
    ));
    bytes.extend(chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1, 2], Some(&weights)),
    ));

    let model = mdl::decode(&bytes).unwrap();
    let decoded = model.meshes[0].weights.as_ref().unwrap();
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded[0].weights, [0.5, 0.5, 0.0, 0.0]);
    assert_eq!(decoded[1].weights, [1.0, 0.0, 0.0, 0.0]);
    assert_eq!(decoded[2].weights, [1.0, 0.0, 0.0, 0.0]);
}

#[test]
fn weighted_bone_index_out_of_range_is_rejected() {
    let weights = [
        ([7u16, 0, 0, 0], [1.0f32, 0.0, 0.0, 0.0]),
        ([0, 0, 0, 0], [1.0, 0.0, 0.0, 0.0]),
        ([0, 0, 0, 0], [1.0, 0.0, 0.0, 0.0]),
    ];
    let mut bytes = mdl_head();
    bytes.extend(chunk(tags::SKEL, &skeleton_payload(&[("root", -1)])));
    bytes.extend(chunk(
        tags::MATL,
        &materials_payload(&[("skin", "skin.png", 0)]),
    ));
    bytes.extend(chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1, 2], Some(&weights)),
    ));

    assert_eq!(
        mdl::decode(&bytes),
        Err(DecodeError::IndexOutOfRange { index: 7, limit: 1 })
    );
}

#[test]
fn zero_weight_slots_may_carry_stale_indices() {
    // Exporters leave garbage in unused weight slots; only weighted slots
    // are validated against the bone table.
    let weights = [
        ([0u16, 999, 999, 999], [1.0f32, 0.0, 0.0, 0.0]),
        ([0, 999, 999, 999], [1.0, 0.0, 0.0, 0.0]),
        ([0, 999, 999, 999], [1.0, 0.0, 0.0, 0.0]),
    ];
    let mut bytes = mdl_head();
    bytes.extend(chunk(tags::SKEL, &skeleton_payload(&[("root", -1)])));
    bytes.extend(chunk(
        tags::MATL,
        &materials_payload(&[("skin", "skin.png", 0)]),
    ));
    bytes.extend(chunk(
        tags::MESH,
        &mesh_payload("body", 0, &triangle_vertices(), &[0, 1, 2], Some(&weights)),
    ));

    assert!(mdl::decode(&bytes).is_ok());
}

#[test]
fn truncated_input_never_panics() {
    let bytes = simple_mdl();
    for len in 0..bytes.len() {
        let _ = mdl::decode(&bytes[..len]);
    }
}

#[test]
fn cut_inside_a_chunk_payload_is_an_error() {
    let bytes = simple_mdl();
    // Halfway into the final mesh chunk's payload.
    let cut = bytes.len() - 20;
    assert!(matches!(
        mdl::decode(&bytes[..cut]),
        Err(DecodeError::TruncatedData { .. } | DecodeError::MalformedChunk { .. })
    ));
}
