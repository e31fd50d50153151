use std::path::{Path, PathBuf};

pub mod glb;

pub use glb::ModelAsset;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Model error in {}: {source}", path.display())]
    Model {
        path: PathBuf,
        source: glb::GlbError,
    },
}

/// Loads bundled assets from a root directory by relative path.
pub struct AssetLoader {
    root: PathBuf,
}

impl AssetLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    pub fn load_raw(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, AssetError> {
        let full = self.root.join(path.as_ref());
        if !full.exists() {
            return Err(AssetError::NotFound(full));
        }
        std::fs::read(&full).map_err(|source| AssetError::Io { path: full, source })
    }

    pub fn load_model(&self, path: impl AsRef<Path>) -> Result<ModelAsset, AssetError> {
        let data = self.load_raw(path.as_ref())?;
        let mut cursor = std::io::Cursor::new(data);
        ModelAsset::read(&mut cursor).map_err(|source| AssetError::Model {
            path: path.as_ref().to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_found() {
        let loader = AssetLoader::new(std::env::temp_dir());
        let result = loader.load_raw("does/not/exist.glb");
        assert!(matches!(result, Err(AssetError::NotFound(_))));
    }
}
