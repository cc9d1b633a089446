//! Build engine collaborator.
//!
//! The engine performs the actual player build. The sequencer only
//! resolves presets into [`BuildRequest`]s and reacts to the returned
//! [`BuildOutcome`].

use std::path::{Path, PathBuf};

use gamebuilder_presets::{BuildOptions, BuildTarget, Subtarget, TargetGroup};
use serde::{Deserialize, Serialize};

use crate::BoxFuture;
use crate::error::BuildError;

/// Everything the engine needs for one build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub options: BuildOptions,
    pub scene_paths: Vec<PathBuf>,
    pub target: BuildTarget,
    pub subtarget: Subtarget,
    pub target_group: TargetGroup,
    pub scripting_defines: Vec<String>,
    pub output_path: PathBuf,
    /// Kinds of the post-processors scheduled after this build.
    pub post_processors: Vec<String>,
}

/// Engine-reported result of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildResultKind {
    Succeeded,
    Failed,
    Cancelled,
    Unknown,
}

/// Summary of one finished build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub result: BuildResultKind,
    pub output_path: PathBuf,
    pub total_duration_seconds: f64,
    pub size_bytes: u64,
}

impl BuildOutcome {
    pub fn succeeded(&self) -> bool {
        self.result == BuildResultKind::Succeeded
    }

    /// Directory that contains the built artifact.
    pub fn output_dir(&self) -> &Path {
        self.output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    }
}

/// Abstract build engine.
///
/// Builds are assumed to be exclusive: callers never run two at once.
pub trait BuildEngine: Send + Sync {
    /// Fast pre-check: is the target (and its build support) installed?
    fn is_target_supported(&self, group: TargetGroup, target: BuildTarget) -> bool;

    /// Runs one build. Not cancellable once started.
    fn build<'a>(
        &'a self,
        request: &'a BuildRequest,
    ) -> BoxFuture<'a, Result<BuildOutcome, BuildError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(path: &str) -> BuildOutcome {
        BuildOutcome {
            result: BuildResultKind::Succeeded,
            output_path: PathBuf::from(path),
            total_duration_seconds: 0.0,
            size_bytes: 0,
        }
    }

    #[test]
    fn output_dir_of_nested_artifact() {
        assert_eq!(outcome("Builds/1.0/Game.exe").output_dir(), Path::new("Builds/1.0"));
    }

    #[test]
    fn bare_file_name_lives_in_current_dir() {
        assert_eq!(outcome("Game").output_dir(), Path::new("."));
        assert_eq!(outcome("").output_dir(), Path::new("."));
    }
}
