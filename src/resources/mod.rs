//! Loading assets from a game installation directory.
//!
//! This module contains all logic for turning files on disk into decoded
//! assets: scanning an install root for viewable files, reading and decoding
//! single models and levels, and the filesystem-backed model resolver the
//! level decoder uses for entity references. Decoding itself never touches
//! the filesystem; everything that does lives here.

use std::{
    cell::RefCell,
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    data_structures::{level::Level, model::Model},
    formats::{DecodeWarning, mdl, wmb::{self, ModelResolver}},
};

pub mod texture;

/// The kind of asset a file path points at, by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Level,
}

impl AssetKind {
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mdl" => Some(AssetKind::Model),
            // WDL and WMB carry the same payload under two extensions.
            "wmb" | "wdl" => Some(AssetKind::Level),
            _ => None,
        }
    }
}

/// Recursively collect every viewable asset file under `root`, sorted for a
/// stable navigation order.
pub fn scan_assets(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if AssetKind::of(&path).is_some() {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Read and decode one model file. The model's name is its file stem.
pub fn load_model(path: &Path) -> anyhow::Result<Model> {
    let bytes = std::fs::read(path)?;
    let mut model = mdl::decode(&bytes)?;
    model.name = file_stem(path);
    Ok(model)
}

/// Read and decode one level file, resolving entity model references
/// through `resolver`. Warnings are returned, not raised.
pub fn load_level(
    path: &Path,
    resolver: &dyn ModelResolver,
) -> anyhow::Result<(Level, Vec<DecodeWarning>)> {
    let bytes = std::fs::read(path)?;
    let decode = wmb::decode(&bytes, resolver)?;
    let mut level = decode.level;
    level.name = file_stem(path);
    for warning in &decode.warnings {
        log::warn!("{}: {}", level.name, warning);
    }
    Ok((level, decode.warnings))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Resolves entity model references against a game installation root and
/// caches decoded models, including negative results so a missing model is
/// only reported once per level load.
pub struct FsModelResolver {
    root: PathBuf,
    cache: RefCell<HashMap<String, Option<Arc<Model>>>>,
}

impl FsModelResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl ModelResolver for FsModelResolver {
    fn resolve(&self, path: &str) -> Option<Arc<Model>> {
        if let Some(cached) = self.cache.borrow().get(path) {
            return cached.clone();
        }
        let resolved = match load_model(&self.root.join(path)) {
            Ok(model) => Some(Arc::new(model)),
            Err(err) => {
                log::warn!("could not resolve model '{}': {}", path, err);
                None
            }
        };
        self.cache
            .borrow_mut()
            .insert(path.to_string(), resolved.clone());
        resolved
    }
}
