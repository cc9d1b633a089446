//! Automated builds driven by source control.
//!
//! The [`CommitWatcher`] polls a [`CommitSource`] (git by default). When the
//! head commit changes it counts down and then asks the caller to build.
//! Building itself is left to the caller, so this crate does not depend on
//! the build pipeline.

use std::future::Future;
use std::pin::Pin;

pub mod error;
pub mod source;
pub mod watcher;

/// Boxed `Send` future returned by [`CommitSource`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export primary types for convenience.
pub use error::WatchError;
pub use source::{CommitSource, GitCommitSource};
pub use watcher::{CommitWatcher, MIN_CHECK_INTERVAL, WatchConfig, WatchEvent};
