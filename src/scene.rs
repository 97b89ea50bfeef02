//! Scene assembly: decoded assets to a flat, drawable item list.
//!
//! [`assemble`] is a pure function of (asset, resources, camera view): it
//! walks a model or level, applies placement transforms and optional
//! skeletal pose, filters by the view frustum, and returns the flattened
//! [`RenderScene`]. Nothing is cached and nothing is mutated, which is what
//! lets the render loop call it every frame without accumulating state; the
//! returned scene is a derived, disposable view of the immutable asset.

use std::sync::Arc;

use cgmath::{Matrix4, Point3, SquareMatrix, Transform as _, Vector3};
use image::RgbaImage;

use crate::{
    camera::Frustum,
    data_structures::{
        bounds::Aabb,
        level::Level,
        model::{Material, Mesh, Model, Pose},
    },
    resources::texture::ResourceSet,
};

/// The asset a viewer currently has open.
#[derive(Clone)]
pub enum Asset {
    Model(Arc<Model>),
    Level(Arc<Level>),
}

impl Asset {
    pub fn name(&self) -> &str {
        match self {
            Asset::Model(m) => &m.name,
            Asset::Level(l) => &l.name,
        }
    }

    pub fn bounds(&self) -> Aabb {
        match self {
            Asset::Model(m) => m.bounds,
            Asset::Level(l) => l.bounds,
        }
    }
}

/// One renderable unit: a mesh under a world transform with its material.
///
/// Borrowed from the immutable asset; the rasterizer consumes items without
/// mutating them. `positions`, when set, overrides the mesh's bind-pose
/// vertex positions with skinned ones for this frame.
pub struct DrawItem<'a> {
    pub mesh: &'a Mesh,
    pub transform: Matrix4<f32>,
    pub material: Option<&'a Material>,
    pub texture: Arc<RgbaImage>,
    /// World-space bounds of this item.
    pub bounds: Aabb,
    pub positions: Option<Vec<[f32; 3]>>,
}

/// The flattened draw list for one frame. Owned by the assembling call and
/// rebuilt per visibility query; never persisted.
pub struct RenderScene<'a> {
    pub items: Vec<DrawItem<'a>>,
}

/// Assemble the visible subset of `asset` into a draw list.
///
/// For a model, `root` places it in the world and `pose` optionally replaces
/// the bind pose; skinned vertex positions are recomputed here, at view
/// time, so the decoded geometry stays reusable across arbitrary poses. For
/// a level, one item is produced per static mesh and per mesh of every
/// resolved placement. Items outside `frustum` are omitted, not marked.
pub fn assemble<'a>(
    asset: &'a Asset,
    resources: &ResourceSet,
    frustum: &Frustum,
    root: Matrix4<f32>,
    pose: Option<&Pose>,
) -> RenderScene<'a> {
    let mut items = Vec::new();
    match asset {
        Asset::Model(model) => {
            push_model_items(&mut items, model, resources, root, pose);
        }
        Asset::Level(level) => {
            push_level_items(&mut items, level, resources);
        }
    }
    items.retain(|item| frustum.intersects(&item.bounds));
    RenderScene { items }
}

fn push_model_items<'a>(
    items: &mut Vec<DrawItem<'a>>,
    model: &'a Model,
    resources: &ResourceSet,
    root: Matrix4<f32>,
    pose: Option<&Pose>,
) {
    let skinning = pose.and_then(|p| skinning_matrices(model, p));
    for mesh in &model.meshes {
        let material = model.material(mesh.material);
        let positions = match (&skinning, &mesh.weights) {
            (Some(matrices), Some(weights)) => Some(skin_positions(mesh, weights, matrices)),
            _ => None,
        };
        let bounds = match &positions {
            Some(p) => Aabb::from_points(p.iter().copied()).transformed(&root),
            None => mesh.bounds().transformed(&root),
        };
        items.push(DrawItem {
            mesh,
            transform: root,
            material,
            texture: resources.texture_for(material),
            bounds,
            positions,
        });
    }
}

fn push_level_items<'a>(items: &mut Vec<DrawItem<'a>>, level: &'a Level, resources: &ResourceSet) {
    for mesh in &level.meshes {
        let material = level.materials.get(mesh.material as usize);
        items.push(DrawItem {
            mesh,
            transform: Matrix4::identity(),
            material,
            texture: resources.texture_for(material),
            bounds: mesh.bounds(),
            positions: None,
        });
    }

    for placement in &level.placements {
        // Unresolved placements have nothing drawable; they stay visible in
        // the level data for inspection but produce no items.
        let Some(model) = &placement.model else {
            continue;
        };
        let world = placement.transform.to_matrix();
        for mesh in &model.meshes {
            let material = model.material(mesh.material);
            items.push(DrawItem {
                mesh,
                transform: world,
                material,
                texture: resources.texture_for(material),
                bounds: mesh.bounds().transformed(&world),
                positions: None,
            });
        }
    }
}

/// Per-bone matrix taking a bind-pose position to its posed position:
/// posed_global * bind_global^-1.
fn skinning_matrices(model: &Model, pose: &Pose) -> Option<Vec<Matrix4<f32>>> {
    if model.bones.is_empty() {
        return None;
    }
    let posed = pose.global_matrices(&model.bones);
    let bind = model.bind_pose().global_matrices(&model.bones);
    Some(
        posed
            .into_iter()
            .zip(bind)
            .map(|(p, b)| p * b.invert().unwrap_or_else(Matrix4::identity))
            .collect(),
    )
}

fn skin_positions(
    mesh: &Mesh,
    weights: &[crate::data_structures::model::BoneWeights],
    matrices: &[Matrix4<f32>],
) -> Vec<[f32; 3]> {
    mesh.vertices
        .iter()
        .zip(weights)
        .map(|(vertex, set)| {
            let p = Point3::from(vertex.position);
            let mut out = Vector3::new(0.0, 0.0, 0.0);
            for slot in 0..4 {
                let w = set.weights[slot];
                if w == 0.0 {
                    continue;
                }
                let moved = matrices[set.indices[slot] as usize].transform_point(p);
                out += Vector3::new(moved.x, moved.y, moved.z) * w;
            }
            [out.x, out.y, out.z]
        })
        .collect()
}
