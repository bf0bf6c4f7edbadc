//! Model registry port: Trait for persisting trained models.
//!
//! The registry owns the artifact files and mediates every read and write.

use std::path::{Path, PathBuf};

use crate::Result;

/// Which artifact form to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactVariant {
    /// Directly serialized model
    #[default]
    Plain,
    /// Size-reduced (gzip) form of the same artifact
    Compressed,
}

impl ArtifactVariant {
    /// File name inside the registry directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Plain => "model.bin",
            Self::Compressed => "model_compressed.bin",
        }
    }
}

impl std::str::FromStr for ArtifactVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "compressed" => Ok(Self::Compressed),
            other => Err(format!(
                "unknown artifact variant '{other}' (expected plain|compressed)"
            )),
        }
    }
}

impl std::fmt::Display for ArtifactVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Compressed => write!(f, "compressed"),
        }
    }
}

/// Trait for model persistence.
pub trait ModelRegistry: Send + Sync {
    /// Model type stored by this registry.
    type Model;

    /// Write a model in the given variant to an explicit path.
    ///
    /// # Errors
    /// Returns error if the model cannot be encoded or written.
    fn save(&self, model: &Self::Model, path: &Path, variant: ArtifactVariant) -> Result<()>;

    /// Read a model from an explicit path (either variant).
    ///
    /// # Errors
    /// Returns `ModelNotFound` if `path` does not exist.
    fn load(&self, path: &Path) -> Result<Self::Model>;

    /// Conventional location of a variant.
    fn path_for(&self, variant: ArtifactVariant) -> PathBuf;

    /// Write a model to its conventional location.
    ///
    /// # Errors
    /// Returns error if the model cannot be encoded or written.
    fn save_variant(&self, model: &Self::Model, variant: ArtifactVariant) -> Result<PathBuf> {
        let path = self.path_for(variant);
        self.save(model, &path, variant)?;
        Ok(path)
    }

    /// Read a model from its conventional location.
    ///
    /// # Errors
    /// Returns `ModelNotFound` if the artifact does not exist.
    fn load_variant(&self, variant: ArtifactVariant) -> Result<Self::Model> {
        self.load(&self.path_for(variant))
    }
}
