//! Texture image loading with placeholder degradation.
//!
//! Materials reference texture files by name; this module resolves those
//! names against the install root once per asset load and hands out shared
//! decoded images. A texture that fails to load degrades to a placeholder
//! pattern instead of aborting scene assembly, so a broken or missing image
//! never blocks inspecting the geometry it covers.

use std::{collections::HashMap, path::Path, sync::Arc};

use image::{Rgba, RgbaImage};

use crate::{data_structures::model::Material, formats::DecodeWarning};

/// The decoded texture images available to scene assembly, keyed by the
/// texture filename as stored in the material table.
pub struct ResourceSet {
    images: HashMap<String, Arc<RgbaImage>>,
    placeholder: Arc<RgbaImage>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            placeholder: Arc::new(placeholder_image()),
        }
    }

    /// Load every texture the given materials reference, relative to `root`.
    /// Each failure is logged, recorded in the returned warning list, and
    /// left to degrade to the placeholder.
    pub fn load_materials(
        &mut self,
        root: &Path,
        materials: &[Material],
    ) -> Vec<DecodeWarning> {
        let mut warnings = Vec::new();
        for material in materials {
            if material.texture.is_empty() || self.images.contains_key(&material.texture) {
                continue;
            }
            match image::open(root.join(&material.texture)) {
                Ok(img) => {
                    self.images
                        .insert(material.texture.clone(), Arc::new(img.to_rgba8()));
                }
                Err(err) => {
                    log::error!(
                        "texture '{}' for material '{}' failed to load: {}",
                        material.texture,
                        material.name,
                        err
                    );
                    warnings.push(DecodeWarning::LoadError {
                        path: material.texture.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        warnings
    }

    /// Register an already decoded image, used by tests and by callers that
    /// source textures from somewhere other than the filesystem.
    pub fn insert(&mut self, name: impl Into<String>, image: RgbaImage) {
        self.images.insert(name.into(), Arc::new(image));
    }

    /// The image for a material, or the placeholder when the material is
    /// missing, textureless, or its image failed to load.
    pub fn texture_for(&self, material: Option<&Material>) -> Arc<RgbaImage> {
        material
            .and_then(|m| self.images.get(&m.texture))
            .cloned()
            .unwrap_or_else(|| self.placeholder.clone())
    }

    pub fn placeholder(&self) -> Arc<RgbaImage> {
        self.placeholder.clone()
    }
}

impl Default for ResourceSet {
    fn default() -> Self {
        Self::new()
    }
}

/// The classic magenta/black checker that makes a missing texture obvious.
fn placeholder_image() -> RgbaImage {
    let magenta = Rgba([255, 0, 255, 255]);
    let black = Rgba([0, 0, 0, 255]);
    RgbaImage::from_fn(16, 16, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 { magenta } else { black }
    })
}
