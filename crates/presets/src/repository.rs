//! Persistence of the preset list.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PresetsError;
use crate::preset::BuildPreset;

/// On-disk shape of the preset model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ModelFile {
    #[serde(default)]
    build_settings: Vec<BuildPreset>,
}

/// Loads and stores the persisted preset model.
pub trait ModelRepository: Send + Sync {
    /// Returns `None` when no model exists yet.
    fn load(&self) -> Result<Option<Vec<BuildPreset>>, PresetsError>;

    /// Creates an empty model.
    fn create(&self) -> Result<(), PresetsError>;

    fn save(&self, presets: &[BuildPreset]) -> Result<(), PresetsError>;

    /// Where the model lives, for log messages.
    fn location(&self) -> String;
}

/// Pretty-printed JSON file at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonModelRepository {
    path: PathBuf,
}

impl JsonModelRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelRepository for JsonModelRepository {
    fn load(&self) -> Result<Option<Vec<BuildPreset>>, PresetsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let model: ModelFile = serde_json::from_str(&content)?;
        Ok(Some(model.build_settings))
    }

    fn create(&self) -> Result<(), PresetsError> {
        self.save(&[])
    }

    fn save(&self, presets: &[BuildPreset]) -> Result<(), PresetsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let model = ModelFile {
            build_settings: presets.to_vec(),
        };
        let json = serde_json::to_string_pretty(&model)?;
        std::fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), presets = presets.len(), "model saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
