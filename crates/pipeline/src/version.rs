//! The host's global version string and its scoped override.

use std::sync::{Arc, Mutex};

use crate::error::BuildError;

/// Host setting holding the project's current version string.
pub trait VersionSource: Send + Sync {
    fn current(&self) -> Result<String, BuildError>;
    fn set(&self, version: &str) -> Result<(), BuildError>;
}

/// Replaces the version for its lifetime and restores the saved value on drop.
pub struct VersionOverride<'a> {
    source: &'a dyn VersionSource,
    saved: String,
}

impl<'a> VersionOverride<'a> {
    /// Saves the current version and writes `version` in its place.
    ///
    /// If the write fails the previous value is restored before returning.
    pub fn apply(source: &'a dyn VersionSource, version: &str) -> Result<Self, BuildError> {
        let saved = source.current()?;
        let guard = Self { source, saved };
        guard.source.set(version)?;
        tracing::debug!(from = %guard.saved, to = %version, "version overridden");
        Ok(guard)
    }

    pub fn saved(&self) -> &str {
        &self.saved
    }
}

impl Drop for VersionOverride<'_> {
    fn drop(&mut self) {
        match self.source.set(&self.saved) {
            Ok(()) => tracing::debug!(version = %self.saved, "version restored"),
            Err(e) => {
                tracing::error!(version = %self.saved, error = %e, "failed to restore version")
            }
        }
    }
}

/// In-memory version source. Clones share the value and the write log.
#[derive(Debug, Clone, Default)]
pub struct MemoryVersionSource {
    inner: Arc<Mutex<MemoryVersion>>,
}

#[derive(Debug, Default)]
struct MemoryVersion {
    value: String,
    writes: Vec<String>,
}

impl MemoryVersionSource {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryVersion {
                value: version.into(),
                writes: Vec::new(),
            })),
        }
    }

    /// Every value written through [`VersionSource::set`], in order.
    pub fn writes(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .writes
            .clone()
    }
}

impl VersionSource for MemoryVersionSource {
    fn current(&self) -> Result<String, BuildError> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .value
            .clone())
    }

    fn set(&self, version: &str) -> Result<(), BuildError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.value = version.to_string();
        inner.writes.push(version.to_string());
        Ok(())
    }
}
