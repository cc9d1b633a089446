//! Preset error types.

/// Errors produced while loading, saving or editing presets.
#[derive(Debug, thiserror::Error)]
pub enum PresetsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("index {index} out of range (len {len})")]
    InvalidIndex { index: usize, len: usize },
}
