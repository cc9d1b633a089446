//! Steps executed after a successful build.
//!
//! # Steps
//!
//! 1. **Terminal**: open a shell at the output directory
//! 2. **Instances**: launch the artifact `instances_to_run` times
//! 3. **Compress**: archive the shippable files of the output directory
//! 4. **Post-processors**: run the preset's processors in order
//!
//! Steps 1–3 are conveniences: a failure is logged and the next step runs.
//! Processors may depend on each other, so the first failing processor
//! stops the ones after it and the error is returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gamebuilder_presets::{BuildPreset, INVALID_PATH, compressed_path};
use tracing::{error, info, warn};

use crate::archive::Archiver;
use crate::engine::BuildOutcome;
use crate::error::BuildError;
use crate::post_processor::{PostBuildContext, PostProcessorRegistry};
use crate::scanner::scan_shippable_files;
use crate::shell::OsShell;

/// What the pipeline did for one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostBuildReport {
    pub terminal_opened: bool,
    pub instances_launched: u32,
    pub archive_path: Option<PathBuf>,
    /// Kinds of the processors that completed.
    pub processors_run: Vec<String>,
    /// Failures of the best-effort steps.
    pub warnings: Vec<String>,
}

/// Runs the post-build steps for one preset.
#[derive(Clone)]
pub struct PostBuildPipeline {
    shell: Arc<dyn OsShell>,
    archiver: Arc<dyn Archiver>,
    registry: PostProcessorRegistry,
    base_dir: Option<PathBuf>,
}

impl PostBuildPipeline {
    pub fn new(
        shell: Arc<dyn OsShell>,
        archiver: Arc<dyn Archiver>,
        registry: PostProcessorRegistry,
    ) -> Self {
        Self {
            shell,
            archiver,
            registry,
            base_dir: None,
        }
    }

    /// Resolves relative archive paths against `dir` instead of the
    /// working directory. Use the directory the engine resolves its
    /// output paths against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Runs every step for a succeeded `outcome`.
    ///
    /// Returns an error only when a post-processor fails.
    pub async fn run(
        &self,
        preset: &BuildPreset,
        outcome: &BuildOutcome,
        version: &str,
        build_number: u64,
    ) -> Result<PostBuildReport, BuildError> {
        let mut report = PostBuildReport::default();
        let output_dir = outcome.output_dir().to_path_buf();

        // 1. Terminal
        if preset.open_in_terminal {
            match self.shell.open_interactive_shell_at(&output_dir).await {
                Ok(()) => report.terminal_opened = true,
                Err(e) => {
                    warn!(preset = %preset.label, error = %e, "failed to open terminal");
                    report.warnings.push(e.to_string());
                }
            }
        }

        // 2. Instances
        for instance in 0..preset.instances_to_run {
            match self.shell.launch_executable(&outcome.output_path).await {
                Ok(()) => report.instances_launched += 1,
                Err(e) => {
                    warn!(
                        preset = %preset.label,
                        instance,
                        error = %e,
                        "failed to launch instance"
                    );
                    report.warnings.push(e.to_string());
                }
            }
        }

        // 3. Compress
        if preset.compress_files {
            match self.compress(preset, &output_dir, version, build_number).await {
                Ok(path) => {
                    info!(
                        preset = %preset.label,
                        archive = %path.display(),
                        "successfully compressed"
                    );
                    report.archive_path = Some(path);
                }
                Err(e) => {
                    error!(preset = %preset.label, error = %e, "error while compressing");
                    report.warnings.push(e.to_string());
                }
            }
        }

        // 4. Post-processors
        let ctx = PostBuildContext {
            preset,
            version,
            build_number,
            shell: self.shell.as_ref(),
        };
        for spec in &preset.post_processors {
            let result = match self.registry.create(spec) {
                Ok(processor) => processor.execute(outcome, &ctx).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                error!(
                    preset = %preset.label,
                    processor = %spec.kind,
                    error = %e,
                    "build post processor failed, the rest will not execute"
                );
                return Err(BuildError::PostProcessor {
                    name: spec.kind.clone(),
                    message: e.to_string(),
                });
            }
            report.processors_run.push(spec.kind.clone());
        }

        Ok(report)
    }

    async fn compress(
        &self,
        preset: &BuildPreset,
        output_dir: &Path,
        version: &str,
        build_number: u64,
    ) -> Result<PathBuf, BuildError> {
        let archive = compressed_path(preset, version, build_number);
        if archive == INVALID_PATH || archive.is_empty() {
            return Err(BuildError::Archive(format!(
                "cannot resolve compressed path template `{}`",
                preset.compress_file_path_template
            )));
        }
        let archive = match &self.base_dir {
            Some(base) if Path::new(&archive).is_relative() => base.join(archive),
            _ => PathBuf::from(archive),
        };

        let scan_dir = output_dir.to_path_buf();
        let files = tokio::task::spawn_blocking(move || scan_shippable_files(&scan_dir))
            .await
            .map_err(|e| BuildError::Archive(format!("task join error: {e}")))??;

        self.archiver
            .create_archive(&files, &archive, preset.compression_level)
            .await?;
        Ok(archive)
    }
}
