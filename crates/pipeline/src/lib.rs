//! Build sequencing and the post-build pipeline.
//!
//! This crate implements *how* presets get built. It talks to the outside
//! world only through collaborator traits (`BuildEngine`, `VersionSource`,
//! `SceneResolver`, `OsShell`, `Archiver`), so every step is testable with
//! mocks. The CLI provides the concrete implementations.
//!
//! # Pipeline
//!
//! 1. **Resolve**: turn a preset into a `BuildRequest` (version, path, target)
//! 2. **Build**: call the engine with the host version temporarily overridden
//! 3. **Count**: bump the persisted build counter once per attempt
//! 4. **Post-build**: terminal, instances, compression, post-processors

use std::future::Future;
use std::pin::Pin;

pub mod archive;
pub mod assets;
pub mod busy;
pub mod engine;
pub mod error;
pub mod post_build;
pub mod post_processor;
pub mod scanner;
pub mod sequencer;
pub mod shell;
pub mod version;

/// Boxed `Send` future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export primary types for convenience.
pub use archive::{Archiver, ZipArchiver};
pub use assets::{MODEL_RETRY_DELAY, SceneResolver, load_or_create_model};
pub use busy::{BusyGuard, BusyTracker};
pub use engine::{BuildEngine, BuildOutcome, BuildRequest, BuildResultKind};
pub use error::BuildError;
pub use post_build::{PostBuildPipeline, PostBuildReport};
pub use post_processor::{
    BuildManifest, PostBuildContext, PostProcessor, PostProcessorFactory, PostProcessorRegistry,
    ShellCommand, WriteManifest,
};
pub use scanner::{DO_NOT_SHIP_MARKER, directory_size, scan_shippable_files};
pub use sequencer::{BuildEvent, BuildSequencer, PresetReport, PresetStatus};
pub use shell::{OsShell, SystemShell};
pub use version::{MemoryVersionSource, VersionOverride, VersionSource};
