mod common;

use std::{collections::HashMap, sync::Arc};

use ackview::formats::{
    DecodeError, DecodeWarning, WMB_MAJOR_VERSION, magic, mdl,
    tags,
    wmb::{self, ModelResolver, NullResolver},
};
use cgmath::Vector3;
use common::*;

/// An in-memory resolver backed by a path-to-model map.
struct MapResolver {
    models: HashMap<String, Arc<ackview::data_structures::model::Model>>,
}

impl ModelResolver for MapResolver {
    fn resolve(&self, path: &str) -> Option<Arc<ackview::data_structures::model::Model>> {
        self.models.get(path).cloned()
    }
}

#[test]
fn decodes_static_geometry() {
    let decode = wmb::decode(&simple_wmb(), &NullResolver).unwrap();

    assert!(decode.warnings.is_empty());
    assert_eq!(decode.level.meshes.len(), 1);
    assert_eq!(decode.level.meshes[0].name, "world");
    assert_eq!(decode.level.materials.len(), 1);
    assert!(decode.level.placements.is_empty());
    assert_eq!(decode.level.bounds.min, Vector3::new(0.0, 0.0, 0.0));
    assert_eq!(decode.level.bounds.max, Vector3::new(10.0, 5.0, 0.0));
}

#[test]
fn unresolved_model_reference_is_a_warning_not_an_error() {
    let mut bytes = simple_wmb();
    bytes.extend(chunk(
        tags::ENTY,
        &placements_payload(&[placement_record(
            2,
            "guard01",
            "models/guard.mdl",
            [1.0, 2.0, 3.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            &[],
        )]),
    ));

    let decode = wmb::decode(&bytes, &NullResolver).unwrap();

    assert_eq!(
        decode.warnings,
        vec![DecodeWarning::UnresolvedReference {
            placement: 0,
            path: "models/guard.mdl".into(),
        }]
    );
    // The placement survives for inspection, just with nothing to draw.
    assert_eq!(decode.level.placements.len(), 1);
    let placement = &decode.level.placements[0];
    assert_eq!(placement.name, "guard01");
    assert_eq!(placement.type_id, 2);
    assert_eq!(placement.model_path.as_deref(), Some("models/guard.mdl"));
    assert!(placement.model.is_none());
}

#[test]
fn resolved_placement_contributes_to_level_bounds() {
    let guard = Arc::new(mdl::decode(&simple_mdl()).unwrap());
    let resolver = MapResolver {
        models: HashMap::from([("models/guard.mdl".to_string(), guard)]),
    };

    let mut bytes = simple_wmb();
    bytes.extend(chunk(
        tags::ENTY,
        &placements_payload(&[placement_record(
            2,
            "guard01",
            "models/guard.mdl",
            [100.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            &[],
        )]),
    ));

    let decode = wmb::decode(&bytes, &resolver).unwrap();

    assert!(decode.warnings.is_empty());
    let placement = &decode.level.placements[0];
    assert!(placement.model.is_some());
    assert_eq!(placement.transform.position, Vector3::new(100.0, 0.0, 0.0));
    // Static geometry reaches x=10; the moved guard reaches x=110.
    assert_eq!(decode.level.bounds.max.x, 110.0);
}

#[test]
fn placement_without_model_path_resolves_to_nothing() {
    let mut bytes = wmb_head();
    bytes.extend(chunk(
        tags::ENTY,
        &placements_payload(&[placement_record(
            1,
            "spawn_point",
            "",
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            &[],
        )]),
    ));

    let decode = wmb::decode(&bytes, &NullResolver).unwrap();
    assert!(decode.warnings.is_empty());
    assert_eq!(decode.level.placements[0].model_path, None);
}

#[test]
fn placement_properties_are_carried_through() {
    let mut bytes = wmb_head();
    bytes.extend(chunk(
        tags::ENTY,
        &placements_payload(&[placement_record(
            2,
            "guard01",
            "",
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            &[("health", "100"), ("team", "red")],
        )]),
    ));

    let decode = wmb::decode(&bytes, &NullResolver).unwrap();
    assert_eq!(
        decode.level.placements[0].properties,
        vec![
            ("health".to_string(), "100".to_string()),
            ("team".to_string(), "red".to_string()),
        ]
    );
}

#[test]
fn world_geometry_with_bone_weights_is_rejected() {
    let weights = [
        ([0u16, 0, 0, 0], [1.0f32, 0.0, 0.0, 0.0]),
        ([0, 0, 0, 0], [1.0, 0.0, 0.0, 0.0]),
        ([0, 0, 0, 0], [1.0, 0.0, 0.0, 0.0]),
    ];
    let mut bytes = wmb_head();
    bytes.extend(chunk(
        tags::GEOM,
        &mesh_payload("world", 0, &triangle_vertices(), &[0, 1, 2], Some(&weights)),
    ));

    assert!(matches!(
        wmb::decode(&bytes, &NullResolver),
        Err(DecodeError::MalformedChunk { tag, .. }) if tag == tags::GEOM
    ));
}

#[test]
fn mdl_magic_in_a_level_file_is_rejected() {
    let bytes = head(magic::MDL, WMB_MAJOR_VERSION, 0);
    assert!(matches!(
        wmb::decode(&bytes, &NullResolver),
        Err(DecodeError::MalformedChunk { .. })
    ));
}

#[test]
fn newer_major_version_is_rejected() {
    let bytes = head(magic::WMB, WMB_MAJOR_VERSION + 1, 0);
    assert!(matches!(
        wmb::decode(&bytes, &NullResolver),
        Err(DecodeError::UnsupportedVersion { format: "WMB", .. })
    ));
}

#[test]
fn version_is_checked_before_any_payload_is_parsed() {
    let mut bytes = head(magic::WMB, WMB_MAJOR_VERSION + 1, 0);
    bytes.extend(chunk(tags::GEOM, &[0u8; 4]));

    assert!(matches!(
        wmb::decode(&bytes, &NullResolver),
        Err(DecodeError::UnsupportedVersion { format: "WMB", major, .. })
            if major == WMB_MAJOR_VERSION + 1
    ));
}

#[test]
fn geometry_material_references_are_validated() {
    let mut bytes = wmb_head();
    bytes.extend(chunk(
        tags::GEOM,
        &mesh_payload("world", 3, &triangle_vertices(), &[0, 1, 2], None),
    ));

    assert_eq!(
        wmb::decode(&bytes, &NullResolver).map(|_| ()),
        Err(DecodeError::DanglingMaterialRef {
            mesh: 0,
            material: 3,
            table_len: 0,
        })
    );
}

#[test]
fn truncated_input_never_panics() {
    let mut bytes = simple_wmb();
    bytes.extend(chunk(
        tags::ENTY,
        &placements_payload(&[placement_record(
            2,
            "guard01",
            "models/guard.mdl",
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            &[("health", "100")],
        )]),
    ));
    for len in 0..bytes.len() {
        let _ = wmb::decode(&bytes[..len], &NullResolver);
    }
}
