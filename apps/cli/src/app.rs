//! Wires the presets, pipeline and watcher crates to the concrete
//! collaborators of a project directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use gamebuilder_automate::{CommitWatcher, GitCommitSource, WatchEvent};
use gamebuilder_pipeline::{
    BuildEvent, BuildSequencer, BusyTracker, MODEL_RETRY_DELAY, PostBuildPipeline,
    PostProcessorRegistry, PresetReport, PresetStatus, SystemShell, VersionSource, ZipArchiver,
    load_or_create_model,
};
use gamebuilder_presets::{
    BuildSettingsStore, JsonModelRepository, Preferences, TomlPreferencesFile, build_path,
    compressed_path, increment_last_integer, version_string,
};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::engine::ProcessBuildEngine;
use crate::scenes::ProjectSceneResolver;
use crate::version::FileVersionSource;

/// Resolved paths of one preset for the current counter and version.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetPaths {
    pub label: String,
    pub version: String,
    pub build_number: u64,
    pub build_path: String,
    pub compressed_path: Option<String>,
}

/// A loaded project.
pub struct App {
    project_dir: PathBuf,
    config: Config,
    store: BuildSettingsStore,
    versions: Arc<FileVersionSource>,
    busy: BusyTracker,
    cancel: CancellationToken,
}

impl App {
    /// Loads preferences and the preset model of `project_dir`.
    ///
    /// Returns an error if `cancel` fires before the model is available.
    pub async fn open(
        project_dir: &Path,
        config: Config,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self> {
        let prefs_file = match &config.preferences_path {
            Some(path) => TomlPreferencesFile::new(absolute(project_dir, path)),
            None => TomlPreferencesFile::default_location(),
        };
        tracing::debug!(path = %prefs_file.path().display(), "using preferences file");
        let prefs = Arc::new(Preferences::load(Box::new(prefs_file))?);

        let repo = JsonModelRepository::new(absolute(project_dir, &config.model_path));
        let busy = BusyTracker::new();
        let presets = load_or_create_model(&repo, &busy, &cancel, MODEL_RETRY_DELAY)
            .await
            .ok_or_else(|| anyhow!("cancelled while loading build settings"))?;

        let versions = Arc::new(FileVersionSource::new(absolute(
            project_dir,
            &config.version_file,
        )));

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            config,
            store: BuildSettingsStore::new(presets, prefs),
            versions,
            busy,
            cancel,
        })
    }

    pub fn store(&self) -> &BuildSettingsStore {
        &self.store
    }

    /// One line per preset, selected presets marked with `>`.
    pub fn list(&self) -> Vec<String> {
        let bounds = self.store.selection_bounds();
        self.store
            .presets()
            .iter()
            .enumerate()
            .map(|(index, preset)| {
                let marker = if bounds.is_some_and(|b| b.contains(index)) {
                    '>'
                } else {
                    ' '
                };
                if preset.is_group_header {
                    format!("{marker} {index:>3}  [{}]", preset.label)
                } else {
                    let indent = if self.store.group_of(index).is_some() { "  " } else { "" };
                    format!(
                        "{marker} {index:>3}  {indent}{} ({})",
                        preset.label, preset.platform
                    )
                }
            })
            .collect()
    }

    /// Paths for `preset`, or the selected preset.
    pub fn paths(&self, preset: Option<usize>) -> anyhow::Result<PresetPaths> {
        let index = preset
            .or_else(|| self.store.selected_index())
            .ok_or_else(|| anyhow!("no preset selected"))?;
        let preset = self
            .store
            .get(index)
            .ok_or_else(|| anyhow!("no preset at index {index}"))?;
        if preset.is_group_header {
            bail!("{} is a group header", preset.label);
        }

        let build_number = self.store.preferences().build_counter();
        let base = self.versions.current()?;
        let version = version_string(preset, &base, build_number);
        Ok(PresetPaths {
            label: preset.label.clone(),
            build_path: build_path(preset, &version, build_number),
            compressed_path: preset
                .compress_files
                .then(|| compressed_path(preset, &version, build_number)),
            version,
            build_number,
        })
    }

    /// Adds `by` to the last integer of the project version.
    ///
    /// Returns the previous and the new version.
    pub fn bump_version(&self, by: i64) -> anyhow::Result<(String, String)> {
        let current = self.versions.current()?;
        let next = increment_last_integer(&current, by);
        if next != current {
            self.versions.set(&next)?;
        }
        tracing::info!(from = %current, to = %next, "project version bumped");
        Ok((current, next))
    }

    /// Builds the selection, optionally replacing it first.
    pub async fn build(
        &mut self,
        preset: Option<usize>,
        range: Option<i64>,
    ) -> anyhow::Result<Vec<PresetReport>> {
        if let Some(index) = preset {
            if index >= self.store.len() {
                bail!("no preset at index {index}");
            }
            self.store.set_selection(index, range.unwrap_or(0));
        } else if let Some(range) = range {
            let anchor = self
                .store
                .selected_index()
                .ok_or_else(|| anyhow!("no preset selected"))?;
            self.store.set_selection(anchor, range);
        }

        let mut sequencer = self.sequencer();
        let printer = sequencer.take_events().map(|mut events| {
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    if let Some(line) = describe_event(&event) {
                        println!("{line}");
                    }
                }
            })
        });

        let result = sequencer.build_selection(&self.store).await;
        // Closes the event channel so the printer drains and exits.
        drop(sequencer);
        if let Some(printer) = printer {
            let _ = printer.await;
        }
        result.context("build failed to start")
    }

    /// Builds the selection after every new commit until cancelled.
    pub async fn watch(&mut self) -> anyhow::Result<()> {
        let source = Arc::new(GitCommitSource::new(&self.project_dir));
        let mut watcher = CommitWatcher::new(source, self.config.watch.to_watch_config())
            .with_cancel_token(self.cancel.clone());
        let printer = watcher.take_events().map(|mut events| {
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    match event {
                        WatchEvent::NewCommit { current, .. } => {
                            println!("new commit {current}");
                        }
                        WatchEvent::Countdown { remaining } => {
                            println!("building in {remaining}s");
                        }
                        _ => {}
                    }
                }
            })
        });

        tracing::info!(
            interval_secs = watcher.config().check_interval.as_secs_f64(),
            build_timer = watcher.config().build_timer,
            "watching for commits"
        );
        while let Some(commit) = watcher.run().await {
            tracing::info!(commit = %commit, "building after new commit");
            let reports = self.build(None, None).await?;
            for line in summarize(&reports) {
                println!("{line}");
            }
            if self.cancel.is_cancelled() {
                break;
            }
        }

        drop(watcher);
        if let Some(printer) = printer {
            let _ = printer.await;
        }
        Ok(())
    }

    fn sequencer(&self) -> BuildSequencer {
        let shell = match &self.config.terminal {
            Some(terminal) => SystemShell::with_terminal(terminal.clone()),
            None => SystemShell::new(),
        };
        let pipeline = PostBuildPipeline::new(
            Arc::new(shell),
            Arc::new(ZipArchiver),
            PostProcessorRegistry::default(),
        )
        .with_base_dir(&self.project_dir);
        BuildSequencer::new(
            Arc::new(ProcessBuildEngine::new(
                &self.project_dir,
                self.config.engine.clone(),
            )),
            self.versions.clone(),
            Arc::new(ProjectSceneResolver::new(&self.project_dir)),
            pipeline,
            self.busy.clone(),
        )
        .with_cancel_token(self.cancel.clone())
    }
}

fn absolute(project_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}

fn describe_event(event: &BuildEvent) -> Option<String> {
    Some(match event {
        BuildEvent::Started {
            index,
            label,
            version,
            build_number,
        } => format!("[{index}] {label}: building {version} (#{build_number})"),
        BuildEvent::Skipped {
            index,
            label,
            reason,
        } => format!("[{index}] {label}: skipped, {reason}"),
        BuildEvent::Finished {
            index,
            label,
            result,
        } => format!("[{index}] {label}: {result:?}"),
        BuildEvent::Failed {
            index,
            label,
            error,
        } => format!("[{index}] {label}: engine error, {error}"),
        BuildEvent::PostBuildFailed {
            index,
            label,
            error,
        } => format!("[{index}] {label}: post-build failed, {error}"),
        BuildEvent::Cancelled { next_index } => format!("cancelled before preset {next_index}"),
        BuildEvent::Completed { .. } => return None,
    })
}

/// Final report lines for a batch.
pub fn summarize(reports: &[PresetReport]) -> Vec<String> {
    let mut lines: Vec<String> = reports
        .iter()
        .map(|report| {
            let status = match &report.status {
                PresetStatus::Skipped { reason } => format!("skipped ({reason})"),
                PresetStatus::EngineError { error } => format!("error ({error})"),
                PresetStatus::Built {
                    outcome,
                    post_build,
                    post_build_error,
                } => {
                    let mut status = format!(
                        "{:?} in {:.1}s, {} bytes",
                        outcome.result, outcome.total_duration_seconds, outcome.size_bytes
                    );
                    if let Some(archive) = post_build.as_ref().and_then(|p| p.archive_path.as_ref())
                    {
                        status.push_str(&format!(", archive {}", archive.display()));
                    }
                    if let Some(error) = post_build_error {
                        status.push_str(&format!(", post-build failed: {error}"));
                    }
                    status
                }
            };
            format!("{:>3}  {}: {status}", report.index, report.label)
        })
        .collect();

    let succeeded = reports
        .iter()
        .filter(|r| r.outcome().is_some_and(|o| o.succeeded()))
        .count();
    lines.push(format!("{succeeded}/{} presets built", reports.len()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamebuilder_presets::{BuildPreset, BuildingPlatform, CompressionLevel, ModelRepository};

    fn write_model(project: &Path, presets: &[BuildPreset]) {
        let repo = JsonModelRepository::new(project.join(Config::default().model_path));
        repo.save(presets).unwrap();
    }

    fn config(project: &Path, program: &str) -> Config {
        Config {
            preferences_path: Some(project.join("prefs.toml")),
            engine: crate::config::EngineConfig {
                program: program.into(),
                ..Default::default()
            },
            ..Config::default()
        }
    }

    async fn open(project: &Path, program: &str) -> App {
        App::open(project, config(project, program), CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_creates_an_empty_model() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(dir.path(), "true").await;
        assert!(app.store().is_empty());
        assert!(dir.path().join(Config::default().model_path).exists());
        assert_eq!(app.list(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn paths_use_counter_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut preset = BuildPreset::new("Win", BuildingPlatform::Windows);
        preset.version_number_template = "{0}.{1}".into();
        preset.compress_files = true;
        preset.compression_level = CompressionLevel::Optimal;
        write_model(dir.path(), &[BuildPreset::group_header("Clients"), preset]);

        let app = open(dir.path(), "true").await;
        app.versions.set("1.4").unwrap();

        let paths = app.paths(Some(1)).unwrap();
        assert_eq!(paths.version, "1.4.0");
        assert_eq!(paths.build_number, 0);
        assert_eq!(paths.build_path, "Builds/1.4.0/Game.exe");
        assert_eq!(paths.compressed_path.as_deref(), Some("Builds/Game-1.4.0.zip"));

        assert!(app.paths(Some(0)).is_err());
        assert!(app.paths(Some(9)).is_err());

        let lines = app.list();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[Clients]"));
        assert!(lines[1].contains("Win (Windows)"));
    }

    #[tokio::test]
    async fn bump_version_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(dir.path(), "true").await;
        app.versions.set("0.9.9").unwrap();

        let (before, after) = app.bump_version(1).unwrap();
        assert_eq!(before, "0.9.9");
        assert_eq!(after, "0.9.10");
        assert_eq!(app.versions.current().unwrap(), "0.9.10");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn build_increments_counter_and_restores_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut preset = BuildPreset::new("Linux", BuildingPlatform::Linux);
        preset.version_number_template = "{0}-b{1}".into();
        write_model(dir.path(), &[preset.clone(), preset]);

        let mut app = open(dir.path(), "true").await;
        app.versions.set("2.0").unwrap();

        let reports = app.build(Some(0), Some(1)).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.outcome().is_some_and(|o| o.succeeded())));
        assert_eq!(app.store().preferences().build_counter(), 2);
        assert_eq!(app.versions.current().unwrap(), "2.0");

        let summary = summarize(&reports);
        assert_eq!(summary.last().map(String::as_str), Some("2/2 presets built"));

        // Selection and counter were persisted.
        let reopened = open(dir.path(), "true").await;
        assert_eq!(reopened.store().preferences().build_counter(), 2);
        assert_eq!(reopened.store().selection_range(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn archive_lands_in_the_project_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut preset = BuildPreset::new("Linux", BuildingPlatform::Linux);
        preset.build_path_template = "ArchiveBuilds/{0}/Game{1}".into();
        preset.compress_files = true;
        preset.compress_file_path_template = "ArchiveBuilds/Game-{0}{3}".into();
        write_model(dir.path(), &[preset]);

        let mut settings = config(dir.path(), "sh");
        settings.engine.args = vec!["-c".into(), "echo hi > ArchiveBuilds/1.0/Game".into()];
        let mut app = App::open(dir.path(), settings, CancellationToken::new())
            .await
            .unwrap();
        app.versions.set("1.0").unwrap();

        let reports = app.build(Some(0), None).await.unwrap();
        let PresetStatus::Built {
            post_build: Some(post_build),
            ..
        } = &reports[0].status
        else {
            panic!("unexpected status: {:?}", reports[0].status);
        };

        let archive = dir.path().join("ArchiveBuilds").join("Game-1.0.zip");
        assert_eq!(post_build.archive_path.as_ref(), Some(&archive));
        assert!(post_build.warnings.is_empty(), "{:?}", post_build.warnings);
        assert!(archive.is_file());
        assert!(!Path::new("ArchiveBuilds").exists());

        // Entry names are relative to the archive directory.
        let bytes = std::fs::read(&archive).unwrap();
        assert!(bytes.windows(8).any(|w| w == b"1.0/Game"));
    }

    #[tokio::test]
    async fn build_rejects_unknown_preset() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = open(dir.path(), "true").await;
        assert!(app.build(Some(3), None).await.is_err());
    }
}
