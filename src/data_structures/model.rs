//! Decoded model data: meshes, skeleton, and materials.
//!
//! Everything in this module is plain CPU-side data, immutable once a decode
//! returns it. GPU resources are created from these types by the viewer, not
//! stored in them, so a decoded model can be shared read-only between the
//! loader and the render loop.

use cgmath::{Matrix4, SquareMatrix};

use crate::data_structures::{bounds::Aabb, transform::Transform};

/// One mesh vertex in bind pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

/// Up to four bone influences for one vertex. Weights are normalized at
/// decode time; unused slots carry weight 0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneWeights {
    pub indices: [u16; 4],
    pub weights: [f32; 4],
}

/// A triangle mesh with a reference into the model's material table.
///
/// `weights`, when present, runs parallel to `vertices` (one entry per
/// vertex). The decoder guarantees every index in `indices` is a valid
/// vertex index and every bone index is a valid bone index.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: u32,
    pub weights: Option<Vec<BoneWeights>>,
}

impl Mesh {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|v| v.position))
    }
}

/// One bone of a skeleton, stored flat with a parent index.
///
/// The flat parent-index layout avoids any pointer graph: the decoder
/// validates once that following parents always terminates at a root, after
/// which consumers can walk the array freely.
#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone, `None` for a root.
    pub parent: Option<usize>,
    /// Bind-pose transform relative to the parent.
    pub local: Transform,
}

/// A material table entry. The flags bitmask is not interpreted here; it is
/// passed through to the rasterizer untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub texture: String,
    pub flags: u32,
}

/// A decoded model: meshes, an optional skeleton, and a material table.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
    /// Empty for static models.
    pub bones: Vec<Bone>,
    pub materials: Vec<Material>,
    /// Union of all vertex positions across all meshes, in bind pose.
    pub bounds: Aabb,
}

impl Model {
    pub fn material(&self, index: u32) -> Option<&Material> {
        self.materials.get(index as usize)
    }

    /// The skeleton's rest pose: every bone at its stored local transform.
    pub fn bind_pose(&self) -> Pose {
        Pose {
            locals: self.bones.iter().map(|b| b.local).collect(),
        }
    }
}

/// A skeletal pose: one local transform per bone, in bone-table order.
///
/// Decoded geometry stays in bind pose; a `Pose` is applied at scene
/// assembly time so the same model can be drawn under arbitrary poses.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose {
    pub locals: Vec<Transform>,
}

impl Pose {
    /// Model-space matrix per bone: each bone's local transform composed
    /// with its parent chain. Bones whose index is missing from the pose
    /// fall back to their bind transform.
    pub fn global_matrices(&self, bones: &[Bone]) -> Vec<Matrix4<f32>> {
        let mut globals: Vec<Option<Matrix4<f32>>> = vec![None; bones.len()];
        for i in 0..bones.len() {
            self.resolve_global(bones, i, &mut globals);
        }
        globals
            .into_iter()
            .map(|m| m.unwrap_or_else(Matrix4::identity))
            .collect()
    }

    fn resolve_global(
        &self,
        bones: &[Bone],
        index: usize,
        globals: &mut Vec<Option<Matrix4<f32>>>,
    ) -> Matrix4<f32> {
        if let Some(m) = globals[index] {
            return m;
        }
        let local = self
            .locals
            .get(index)
            .copied()
            .unwrap_or(bones[index].local)
            .to_matrix();
        // Parent chains are acyclic after decode validation, so this
        // recursion is bounded by the skeleton depth.
        let global = match bones[index].parent {
            Some(parent) => self.resolve_global(bones, parent, globals) * local,
            None => local,
        };
        globals[index] = Some(global);
        global
    }
}
