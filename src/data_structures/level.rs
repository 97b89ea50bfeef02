//! Decoded level data: static world geometry and entity placements.

use std::sync::Arc;

use crate::data_structures::{bounds::Aabb, model::{Mesh, Model}, transform::Transform};

/// One entity record placed in the world.
///
/// A placement that references a model keeps the reference path even when
/// the resolver could not supply the model, so the viewer can report what is
/// missing without dropping the record.
#[derive(Clone, Debug)]
pub struct EntityPlacement {
    /// The format's numeric object type. Recognized values are position,
    /// light and entity records; anything else is kept opaque.
    pub type_id: u32,
    pub name: String,
    pub transform: Transform,
    /// Relative path of the referenced model file, if this placement
    /// references one.
    pub model_path: Option<String>,
    /// The resolved model, `None` when unresolved or not applicable.
    pub model: Option<Arc<Model>>,
    /// Opaque key/value strings attached by the level editor.
    pub properties: Vec<(String, String)>,
}

impl EntityPlacement {
    /// World-space bounds of the resolved model under this placement's
    /// transform. Empty when no model is attached.
    pub fn bounds(&self) -> Aabb {
        match &self.model {
            Some(model) => model.bounds.transformed(&self.transform.to_matrix()),
            None => Aabb::empty(),
        }
    }
}

/// A decoded level: world geometry plus placed entities.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    /// Static world geometry. No skeletons; material indices reference
    /// `materials`.
    pub meshes: Vec<Mesh>,
    pub materials: Vec<crate::data_structures::model::Material>,
    pub placements: Vec<EntityPlacement>,
    /// Union of static geometry bounds and every resolved placement's
    /// transformed bounds. Unresolved placements do not contribute.
    pub bounds: Aabb,
}
