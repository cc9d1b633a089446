//! Watcher error types.

/// Errors produced while querying source control.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },
}
