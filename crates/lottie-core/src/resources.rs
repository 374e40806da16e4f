//! Byte sources for nested animations and image assets.

use std::path::{Path, PathBuf};

use tracing::debug;

pub trait ResourceProvider {
    /// Returns the full contents of `name`, or `None` when it cannot be read.
    fn open_stream(&self, name: &str) -> Option<Vec<u8>>;
}

/// Provider that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResourceProvider;

impl ResourceProvider for NullResourceProvider {
    fn open_stream(&self, _name: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Resolves names relative to a base directory.
#[derive(Debug, Clone)]
pub struct DirectoryResourceProvider {
    dir: PathBuf,
}

impl DirectoryResourceProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ResourceProvider for DirectoryResourceProvider {
    fn open_stream(&self, name: &str) -> Option<Vec<u8>> {
        let path = self.dir.join(name);
        match std::fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => {
                debug!(path = %path.display(), "Empty resource");
                None
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Could not open resource");
                None
            }
        }
    }
}

/// Joins an asset's directory and file name the way exporters write them:
/// `u` may be empty or carry its own trailing separator.
pub fn join_asset_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}
