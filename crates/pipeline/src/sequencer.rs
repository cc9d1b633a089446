//! Build sequencer: builds a selection range one preset at a time.
//!
//! For every buildable preset in ascending index order:
//!
//! 1. **Resolve**: version, output path, target and scenes; an invalid
//!    configuration skips the preset without touching the version or the
//!    build counter
//! 2. **Override**: the host version is replaced for the duration of the
//!    engine call and restored afterwards
//! 3. **Build**: the engine runs the build
//! 4. **Count**: the build counter is incremented once per attempt
//! 5. **Post-build**: the pipeline runs when the build succeeded
//!
//! A failing preset never stops the batch. Cancellation is observed before
//! each preset; a started engine call always runs to completion.

use std::path::PathBuf;
use std::sync::Arc;

use gamebuilder_presets::{
    BuildPreset, BuildSettingsStore, INVALID_PATH, SelectionBounds, build_path, version_string,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::assets::SceneResolver;
use crate::busy::BusyTracker;
use crate::engine::{BuildEngine, BuildOutcome, BuildRequest, BuildResultKind};
use crate::error::BuildError;
use crate::post_build::{PostBuildPipeline, PostBuildReport};
use crate::version::{VersionOverride, VersionSource};

/// Progress event emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    /// The engine is about to build a preset.
    Started {
        index: usize,
        label: String,
        version: String,
        build_number: u64,
    },
    /// The preset was not built because its configuration is invalid.
    Skipped {
        index: usize,
        label: String,
        reason: String,
    },
    /// The engine returned an outcome.
    Finished {
        index: usize,
        label: String,
        result: BuildResultKind,
    },
    /// The engine call failed.
    Failed {
        index: usize,
        label: String,
        error: String,
    },
    /// A post-processor failed after a successful build.
    PostBuildFailed {
        index: usize,
        label: String,
        error: String,
    },
    /// The batch stopped before `next_index` because it was cancelled.
    Cancelled { next_index: usize },
    /// Every preset of the range was handled.
    Completed { attempted: usize },
}

/// What happened to one preset.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetStatus {
    /// Invalid configuration, the engine was not called.
    Skipped { reason: String },
    /// The engine call returned an error.
    EngineError { error: String },
    /// The engine returned an outcome. Post-build results are present only
    /// for succeeded builds.
    Built {
        outcome: BuildOutcome,
        post_build: Option<PostBuildReport>,
        post_build_error: Option<String>,
    },
}

/// Per-preset result of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetReport {
    pub index: usize,
    pub label: String,
    pub status: PresetStatus,
}

impl PresetReport {
    pub fn outcome(&self) -> Option<&BuildOutcome> {
        match &self.status {
            PresetStatus::Built { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// Whether the engine was invoked for this preset.
    pub fn attempted(&self) -> bool {
        !matches!(self.status, PresetStatus::Skipped { .. })
    }
}

/// Fully resolved build of one preset.
struct ResolvedBuild {
    version: String,
    build_number: u64,
    request: BuildRequest,
}

/// Sequences builds over a selection range.
pub struct BuildSequencer {
    engine: Arc<dyn BuildEngine>,
    versions: Arc<dyn VersionSource>,
    scenes: Arc<dyn SceneResolver>,
    pipeline: PostBuildPipeline,
    busy: BusyTracker,
    events_tx: mpsc::Sender<BuildEvent>,
    events_rx: Option<mpsc::Receiver<BuildEvent>>,
    cancel: CancellationToken,
}

impl BuildSequencer {
    pub fn new(
        engine: Arc<dyn BuildEngine>,
        versions: Arc<dyn VersionSource>,
        scenes: Arc<dyn SceneResolver>,
        pipeline: PostBuildPipeline,
        busy: BusyTracker,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            engine,
            versions,
            scenes,
            pipeline,
            busy,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` instead of the sequencer's own token.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are dropped when the receiver falls behind.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<BuildEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token observed between presets.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn busy(&self) -> &BusyTracker {
        &self.busy
    }

    /// Builds the store's current selection. An empty store builds nothing.
    pub async fn build_selection(
        &self,
        store: &BuildSettingsStore,
    ) -> Result<Vec<PresetReport>, BuildError> {
        match store.selection_bounds() {
            Some(bounds) => self.build_range(store, bounds).await,
            None => Ok(Vec::new()),
        }
    }

    /// Builds every buildable preset in `bounds`, in ascending order.
    ///
    /// Fails with [`BuildError::Busy`] when another operation is running.
    /// Group headers produce no report.
    pub async fn build_range(
        &self,
        store: &BuildSettingsStore,
        bounds: SelectionBounds,
    ) -> Result<Vec<PresetReport>, BuildError> {
        if self.busy.is_busy() {
            return Err(BuildError::Busy(self.busy.descriptions().join(", ")));
        }
        let _guard = self
            .busy
            .begin(format!("building presets {}..={}", bounds.least, bounds.most));

        info!(least = bounds.least, most = bounds.most, "build batch started");

        let mut reports = Vec::new();
        for index in bounds.indices() {
            if self.cancel.is_cancelled() {
                warn!(next = index, "build batch cancelled");
                self.emit(BuildEvent::Cancelled { next_index: index });
                return Ok(reports);
            }

            let Some(preset) = store.get(index) else {
                break;
            };
            if preset.is_group_header {
                debug!(index, label = %preset.label, "skipping group header");
                continue;
            }

            reports.push(self.build_preset(store, index, preset).await);
        }

        let attempted = reports.iter().filter(|r| r.attempted()).count();
        info!(attempted, reports = reports.len(), "build batch finished");
        self.emit(BuildEvent::Completed { attempted });
        Ok(reports)
    }

    async fn build_preset(
        &self,
        store: &BuildSettingsStore,
        index: usize,
        preset: &BuildPreset,
    ) -> PresetReport {
        let label = preset.label.clone();
        let build_number = store.preferences().build_counter();

        let resolved = match self.resolve(preset, build_number) {
            Ok(resolved) => resolved,
            Err(reason) => {
                warn!(index, preset = %label, %reason, "skipping preset");
                self.emit(BuildEvent::Skipped {
                    index,
                    label: label.clone(),
                    reason: reason.clone(),
                });
                return PresetReport {
                    index,
                    label,
                    status: PresetStatus::Skipped { reason },
                };
            }
        };

        self.emit(BuildEvent::Started {
            index,
            label: label.clone(),
            version: resolved.version.clone(),
            build_number: resolved.build_number,
        });
        info!(
            index,
            preset = %label,
            version = %resolved.version,
            build_number = resolved.build_number,
            path = %resolved.request.output_path.display(),
            "building preset"
        );

        // The override is restored at the end of the match arm.
        let result = match VersionOverride::apply(self.versions.as_ref(), &resolved.version) {
            Ok(_override) => self.engine.build(&resolved.request).await,
            Err(e) => Err(e),
        };

        let counter = store.preferences().increment_build_counter();
        debug!(index, counter, "build counter incremented");

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(index, preset = %label, error = %e, "build failed with an error");
                self.emit(BuildEvent::Failed {
                    index,
                    label: label.clone(),
                    error: e.to_string(),
                });
                return PresetReport {
                    index,
                    label,
                    status: PresetStatus::EngineError {
                        error: e.to_string(),
                    },
                };
            }
        };

        self.emit(BuildEvent::Finished {
            index,
            label: label.clone(),
            result: outcome.result,
        });

        if !outcome.succeeded() {
            warn!(index, preset = %label, result = ?outcome.result, "build did not succeed");
            return PresetReport {
                index,
                label,
                status: PresetStatus::Built {
                    outcome,
                    post_build: None,
                    post_build_error: None,
                },
            };
        }

        info!(
            index,
            preset = %label,
            size = outcome.size_bytes,
            seconds = outcome.total_duration_seconds,
            "build succeeded"
        );

        let (post_build, post_build_error) = match self
            .pipeline
            .run(preset, &outcome, &resolved.version, resolved.build_number)
            .await
        {
            Ok(report) => (Some(report), None),
            Err(e) => {
                self.emit(BuildEvent::PostBuildFailed {
                    index,
                    label: label.clone(),
                    error: e.to_string(),
                });
                (None, Some(e.to_string()))
            }
        };

        PresetReport {
            index,
            label,
            status: PresetStatus::Built {
                outcome,
                post_build,
                post_build_error,
            },
        }
    }

    /// Resolves a preset into a build request, or explains why it cannot be built.
    fn resolve(&self, preset: &BuildPreset, build_number: u64) -> Result<ResolvedBuild, String> {
        let base_version = self
            .versions
            .current()
            .map_err(|e| format!("cannot read the current version: {e}"))?;

        let version = version_string(preset, &base_version, build_number);
        if version == INVALID_PATH || version.is_empty() {
            return Err(format!(
                "invalid version template `{}`",
                preset.version_number_template
            ));
        }

        let output_path = build_path(preset, &version, build_number);
        if output_path == INVALID_PATH || output_path.is_empty() {
            return Err(format!(
                "invalid build path template `{}`",
                preset.build_path_template
            ));
        }

        let platform = preset.platform;
        if !self
            .engine
            .is_target_supported(platform.target_group(), platform.build_target())
        {
            return Err(format!("{platform} build support is not installed"));
        }

        let scene_paths = preset
            .scenes
            .iter()
            .map(|scene| self.scenes.scene_path(scene))
            .collect::<Result<Vec<PathBuf>, BuildError>>()
            .map_err(|e| e.to_string())?;

        let request = BuildRequest {
            options: preset.build_options,
            scene_paths,
            target: platform.build_target(),
            subtarget: platform.subtarget(),
            target_group: platform.target_group(),
            scripting_defines: preset.scripting_defines.iter().cloned().collect(),
            output_path: PathBuf::from(output_path),
            post_processors: preset
                .post_processors
                .iter()
                .map(|p| p.kind.clone())
                .collect(),
        };

        Ok(ResolvedBuild {
            version,
            build_number,
            request,
        })
    }

    fn emit(&self, event: BuildEvent) {
        let _ = self.events_tx.try_send(event);
    }
}
