//! Build engine that delegates to an external program.
//!
//! The request is written as JSON next to the project (`Temp/`) and its path
//! is passed as the last argument. The program's exit status decides the
//! result.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use gamebuilder_pipeline::{
    BoxFuture, BuildEngine, BuildError, BuildOutcome, BuildRequest, BuildResultKind,
    directory_size,
};
use gamebuilder_presets::{BuildTarget, TargetGroup};

use crate::config::EngineConfig;

/// Request file written before every build, relative to the project.
const REQUEST_FILE: &str = "Temp/gamebuilder_request.json";

/// Runs the configured engine program once per build.
pub struct ProcessBuildEngine {
    project_dir: PathBuf,
    config: EngineConfig,
}

impl ProcessBuildEngine {
    pub fn new(project_dir: impl Into<PathBuf>, config: EngineConfig) -> Self {
        Self {
            project_dir: project_dir.into(),
            config,
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    async fn run(&self, request: &BuildRequest) -> Result<BuildOutcome, BuildError> {
        let request_path = self.project_dir.join(REQUEST_FILE);
        if let Some(parent) = request_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request_path, serde_json::to_vec_pretty(request)?).await?;

        let output_path = self.absolute(&request.output_path);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::debug!(
            program = %self.config.program,
            request = %request_path.display(),
            "starting build engine"
        );
        let started = Instant::now();
        let status = tokio::process::Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(&request_path)
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                BuildError::Engine(format!("failed to start {}: {e}", self.config.program))
            })?;
        let elapsed = started.elapsed().as_secs_f64();

        let result = match status.code() {
            Some(0) => BuildResultKind::Succeeded,
            Some(_) => BuildResultKind::Failed,
            None => BuildResultKind::Cancelled,
        };

        let size_bytes = match output_path.parent() {
            Some(dir) if result == BuildResultKind::Succeeded && dir.is_dir() => {
                let dir = dir.to_path_buf();
                tokio::task::spawn_blocking(move || directory_size(&dir))
                    .await
                    .map_err(|e| BuildError::Engine(format!("task join error: {e}")))??
            }
            _ => 0,
        };

        if let Err(e) = tokio::fs::remove_file(&request_path).await {
            tracing::trace!(error = %e, "request file not removed");
        }

        Ok(BuildOutcome {
            result,
            output_path,
            total_duration_seconds: elapsed,
            size_bytes,
        })
    }
}

impl BuildEngine for ProcessBuildEngine {
    fn is_target_supported(&self, _group: TargetGroup, target: BuildTarget) -> bool {
        self.config.supported_targets.is_empty() || self.config.supported_targets.contains(&target)
    }

    fn build<'a>(
        &'a self,
        request: &'a BuildRequest,
    ) -> BoxFuture<'a, Result<BuildOutcome, BuildError>> {
        Box::pin(self.run(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamebuilder_presets::{BuildOptions, Subtarget};

    fn request(output: &str) -> BuildRequest {
        BuildRequest {
            options: BuildOptions::NONE,
            scene_paths: Vec::new(),
            target: BuildTarget::StandaloneLinux64,
            subtarget: Subtarget::Player,
            target_group: TargetGroup::Standalone,
            scripting_defines: Vec::new(),
            output_path: PathBuf::from(output),
            post_processors: Vec::new(),
        }
    }

    #[test]
    fn empty_target_list_supports_everything() {
        let engine = ProcessBuildEngine::new(".", EngineConfig::default());
        assert!(engine.is_target_supported(TargetGroup::Android, BuildTarget::Android));

        let engine = ProcessBuildEngine::new(
            ".",
            EngineConfig {
                supported_targets: vec![BuildTarget::StandaloneLinux64],
                ..EngineConfig::default()
            },
        );
        assert!(
            engine.is_target_supported(TargetGroup::Standalone, BuildTarget::StandaloneLinux64)
        );
        assert!(!engine.is_target_supported(TargetGroup::WebGL, BuildTarget::WebGL));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_maps_to_result() {
        let dir = tempfile::tempdir().unwrap();

        let ok = ProcessBuildEngine::new(
            dir.path(),
            EngineConfig {
                program: "true".into(),
                ..EngineConfig::default()
            },
        );
        let outcome = ok.build(&request("Builds/1.0/Game")).await.unwrap();
        assert_eq!(outcome.result, BuildResultKind::Succeeded);
        assert_eq!(outcome.output_path, dir.path().join("Builds/1.0/Game"));
        assert!(dir.path().join("Builds/1.0").is_dir());
        assert!(!dir.path().join(REQUEST_FILE).exists());

        let failing = ProcessBuildEngine::new(
            dir.path(),
            EngineConfig {
                program: "false".into(),
                ..EngineConfig::default()
            },
        );
        let outcome = failing.build(&request("Builds/1.0/Game")).await.unwrap();
        assert_eq!(outcome.result, BuildResultKind::Failed);
        assert_eq!(outcome.size_bytes, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn engine_receives_request_file() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ProcessBuildEngine::new(
            dir.path(),
            EngineConfig {
                program: "sh".into(),
                args: vec!["-c".into(), "cp \"$0\" Builds/seen.json".into()],
                ..EngineConfig::default()
            },
        );

        let outcome = engine.build(&request("Builds/Game")).await.unwrap();
        assert_eq!(outcome.result, BuildResultKind::Succeeded);

        let raw = std::fs::read_to_string(dir.path().join("Builds/seen.json")).unwrap();
        let seen: BuildRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(seen, request("Builds/Game"));
        assert_eq!(outcome.size_bytes, raw.len() as u64);
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ProcessBuildEngine::new(
            dir.path(),
            EngineConfig {
                program: "/nonexistent/engine/binary".into(),
                ..EngineConfig::default()
            },
        );
        assert!(engine.build(&request("Builds/Game")).await.is_err());
    }
}
