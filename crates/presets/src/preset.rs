//! Build preset data model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::options::BuildOptions;
use crate::platform::BuildingPlatform;

/// Opaque reference to a scene asset.
///
/// The asset resolver of the host turns it into a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneRef(pub String);

impl SceneRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Archive compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompressionLevel {
    NoCompression,
    Fastest,
    #[default]
    Optimal,
    SmallestSize,
}

/// Serialized description of a post-processor.
///
/// `kind` selects a factory in the pipeline's registry, `params` is handed
/// to that factory verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostProcessorSpec {
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl PostProcessorSpec {
    pub fn new(kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// One named build configuration.
///
/// Template placeholders:
/// - `build_path_template`: `{0}` version, `{1}` platform file extension, `{2}` build number
/// - `version_number_template`: `{0}` base version, `{1}` build number
/// - `compress_file_path_template`: `{0}` version, `{1}` platform file extension,
///   `{2}` build number, `{3}` archive extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPreset {
    pub label: String,
    #[serde(default)]
    pub is_group_header: bool,
    /// Fold state of a group header. Ignored on regular presets.
    #[serde(default, skip_serializing_if = "is_false")]
    pub collapsed: bool,
    #[serde(default)]
    pub platform: BuildingPlatform,
    #[serde(default)]
    pub scenes: Vec<SceneRef>,
    #[serde(default)]
    pub scripting_defines: BTreeSet<String>,
    #[serde(default)]
    pub build_options: BuildOptions,
    #[serde(default = "default_build_path")]
    pub build_path_template: String,
    #[serde(default = "default_version_number")]
    pub version_number_template: String,
    #[serde(default)]
    pub compress_files: bool,
    #[serde(default = "default_compress_path")]
    pub compress_file_path_template: String,
    #[serde(default)]
    pub compression_level: CompressionLevel,
    #[serde(default)]
    pub open_in_terminal: bool,
    #[serde(default)]
    pub instances_to_run: u32,
    #[serde(default)]
    pub post_processors: Vec<PostProcessorSpec>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn default_build_path() -> String {
    "Builds/{0}/Game{1}".into()
}

fn default_version_number() -> String {
    "{0}".into()
}

fn default_compress_path() -> String {
    "Builds/Game-{0}{3}".into()
}

impl Default for BuildPreset {
    fn default() -> Self {
        Self {
            label: "New Settings".into(),
            is_group_header: false,
            collapsed: false,
            platform: BuildingPlatform::default(),
            scenes: Vec::new(),
            scripting_defines: BTreeSet::new(),
            build_options: BuildOptions::NONE,
            build_path_template: default_build_path(),
            version_number_template: default_version_number(),
            compress_files: false,
            compress_file_path_template: default_compress_path(),
            compression_level: CompressionLevel::default(),
            open_in_terminal: false,
            instances_to_run: 0,
            post_processors: Vec::new(),
        }
    }
}

impl BuildPreset {
    /// Creates a buildable preset with default templates.
    pub fn new(label: impl Into<String>, platform: BuildingPlatform) -> Self {
        Self {
            label: label.into(),
            platform,
            ..Self::default()
        }
    }

    /// Creates a non-buildable section divider.
    pub fn group_header(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            is_group_header: true,
            ..Self::default()
        }
    }

    /// Human-readable summary of the selected build options.
    pub fn info(&self) -> String {
        self.build_options.describe()
    }
}
