//! Build error types.

/// Errors produced while building presets or running post-build steps.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("a build is already in progress: {0}")]
    Busy(String),

    #[error("build engine error: {0}")]
    Engine(String),

    #[error("shell error: {0}")]
    Shell(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("scene error: {0}")]
    Scene(String),

    #[error("version error: {0}")]
    Version(String),

    #[error("build post processor {name} failed: {message}")]
    PostProcessor { name: String, message: String },

    #[error("unknown post processor kind: {0}")]
    UnknownPostProcessor(String),
}
