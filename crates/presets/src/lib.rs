//! Build presets: data model, path templates, ordered store and persisted selection.
//!
//! This crate holds everything about *what* gets built. It has no
//! knowledge of the engine that performs the build; the pipeline crate
//! consumes the resolved values produced here.
//!
//! # Pieces
//!
//! - **Preset**: one named build configuration (platform, scenes, templates)
//! - **Template**: positional `{n}` substitution with the `"invalid path"` sentinel
//! - **Store**: ordered, groupable preset list with a clamped selection range
//! - **Preferences**: the few integers that survive restarts
//! - **Repository**: JSON persistence of the preset list

pub mod error;
pub mod options;
pub mod platform;
pub mod preferences;
pub mod preset;
pub mod repository;
pub mod store;
pub mod template;

// Re-export primary types for convenience.
pub use error::PresetsError;
pub use options::BuildOptions;
pub use platform::{BuildTarget, BuildingPlatform, Subtarget, TargetGroup};
pub use preferences::{
    MemoryPreferences, PreferenceValues, Preferences, PreferencesBackend, TomlPreferencesFile,
};
pub use preset::{BuildPreset, CompressionLevel, PostProcessorSpec, SceneRef};
pub use repository::{JsonModelRepository, ModelRepository};
pub use store::{BuildSettingsStore, SelectionBounds};
pub use template::{
    INVALID_PATH, TemplateArg, build_path, compressed_path, increment_last_integer, resolve,
    version_string,
};
