//! Asset path configuration.
//!
//! [`AssetPaths`] holds the root directory all relative asset lookups are
//! resolved against, together with the derived `assets/`, `assets/shaders/`
//! and `assets/materials/` subdirectories. It is an explicit configuration
//! value threaded through every load/save call; nothing reads ambient
//! process state for path resolution. Directories are computed by joining,
//! not validated for existence.

use std::path::{Path, PathBuf};

/// Names of the derived subdirectories under the configured root.
const ASSETS_DIR: &str = "assets";
const SHADERS_DIR: &str = "shaders";
const MATERIALS_DIR: &str = "materials";

/// Extension used for persisted material files.
pub const MATERIAL_EXTENSION: &str = "mtrl";

/// Configuration value resolving all relative asset paths.
///
/// # Example
///
/// ```
/// use silene_core::paths::AssetPaths;
///
/// let paths = AssetPaths::new("/project");
/// assert!(paths.shaders().ends_with("assets/shaders"));
/// assert!(paths.material_file("grid").ends_with("assets/materials/grid.mtrl"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    root: PathBuf,
}

impl AssetPaths {
    /// Create a configuration rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a configuration rooted at the process working directory.
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self {
            root: std::env::current_dir()?,
        })
    }

    /// The configured root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The assets directory under the root.
    pub fn assets(&self) -> PathBuf {
        self.root.join(ASSETS_DIR)
    }

    /// The shader directory under the assets directory.
    pub fn shaders(&self) -> PathBuf {
        self.assets().join(SHADERS_DIR)
    }

    /// The material directory under the assets directory.
    pub fn materials(&self) -> PathBuf {
        self.assets().join(MATERIALS_DIR)
    }

    /// Resolve an asset name against the assets directory.
    pub fn asset_file(&self, name: &str) -> PathBuf {
        self.assets().join(name)
    }

    /// Resolve a shader source name against the shader directory.
    pub fn shader_file(&self, name: &str) -> PathBuf {
        self.shaders().join(name)
    }

    /// Resolve a material save name to its `.mtrl` file path.
    pub fn material_file(&self, name: &str) -> PathBuf {
        self.materials()
            .join(format!("{name}.{MATERIAL_EXTENSION}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_directories() {
        let paths = AssetPaths::new("/base");
        assert_eq!(paths.assets(), PathBuf::from("/base/assets"));
        assert_eq!(paths.shaders(), PathBuf::from("/base/assets/shaders"));
        assert_eq!(paths.materials(), PathBuf::from("/base/assets/materials"));
    }

    #[test]
    fn file_resolution() {
        let paths = AssetPaths::new("/base");
        assert_eq!(
            paths.shader_file("basic.vert"),
            PathBuf::from("/base/assets/shaders/basic.vert")
        );
        assert_eq!(
            paths.material_file("stone"),
            PathBuf::from("/base/assets/materials/stone.mtrl")
        );
    }

    #[test]
    fn distinct_roots_are_independent() {
        let a = AssetPaths::new("/a");
        let b = AssetPaths::new("/b");
        assert_ne!(a.shader_file("x.vert"), b.shader_file("x.vert"));
    }
}
