//! Project version stored in a plain text file.

use std::path::{Path, PathBuf};

use gamebuilder_pipeline::{BuildError, VersionSource};

/// Reads and writes the version string in a one-line text file.
#[derive(Debug, Clone)]
pub struct FileVersionSource {
    path: PathBuf,
}

impl FileVersionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VersionSource for FileVersionSource {
    fn current(&self) -> Result<String, BuildError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            BuildError::Version(format!("cannot read {}: {e}", self.path.display()))
        })?;
        Ok(content.trim().to_string())
    }

    fn set(&self, version: &str) -> Result<(), BuildError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, format!("{version}\n"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_trimmed_and_writes_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ProjectSettings").join("version.txt");
        let source = FileVersionSource::new(&path);

        assert!(source.current().is_err());

        source.set("1.2.3").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1.2.3\n");
        assert_eq!(source.current().unwrap(), "1.2.3");
    }
}
