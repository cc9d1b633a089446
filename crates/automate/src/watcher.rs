//! Commit polling and build countdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::source::CommitSource;

/// Shortest allowed delay between two checks.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Polling and countdown timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    pub check_interval: Duration,
    /// Seconds between detecting a commit and requesting the build.
    pub build_timer: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(10),
            build_timer: 10,
        }
    }
}

impl WatchConfig {
    pub fn new(check_interval: Duration, build_timer: u32) -> Self {
        Self {
            check_interval: check_interval.max(MIN_CHECK_INTERVAL),
            build_timer,
        }
    }
}

/// Events emitted by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A check is starting.
    Checking,
    /// The head commit changed.
    NewCommit {
        previous: Option<String>,
        current: String,
    },
    /// Seconds left before the build is requested.
    Countdown { remaining: u32 },
    /// The countdown finished; the caller should build now.
    BuildRequested { commit: String },
    /// Watching stopped without requesting a build.
    Cancelled,
}

/// Polls a [`CommitSource`] and requests a build after each new commit.
///
/// The last observed commit survives across [`CommitWatcher::run`] calls,
/// so restarting after a build only fires on the next change. The very
/// first observation counts as a change.
pub struct CommitWatcher {
    source: Arc<dyn CommitSource>,
    config: WatchConfig,
    last_commit: Option<String>,
    events_tx: mpsc::Sender<WatchEvent>,
    events_rx: Option<mpsc::Receiver<WatchEvent>>,
    cancel: CancellationToken,
}

impl CommitWatcher {
    pub fn new(source: Arc<dyn CommitSource>, config: WatchConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self {
            source,
            config: WatchConfig::new(config.check_interval, config.build_timer),
            last_commit: None,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` instead of the watcher's own token.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<WatchEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token observed at every sleep.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> WatchConfig {
        self.config
    }

    pub fn last_commit(&self) -> Option<&str> {
        self.last_commit.as_deref()
    }

    /// Watches until a build is due and returns the triggering commit.
    ///
    /// Returns `None` when cancelled, including during the countdown.
    pub async fn run(&mut self) -> Option<String> {
        loop {
            if !self.sleep(self.config.check_interval).await {
                return self.cancelled();
            }

            self.emit(WatchEvent::Checking);
            debug!("checking for new commits");
            let Some(commit) = self.check().await else {
                continue;
            };

            info!(commit = %commit, timer = self.config.build_timer, "starting build countdown");
            for remaining in (1..=self.config.build_timer).rev() {
                self.emit(WatchEvent::Countdown { remaining });
                if !self.sleep(Duration::from_secs(1)).await {
                    info!("cancelled build");
                    return self.cancelled();
                }
            }

            self.emit(WatchEvent::BuildRequested {
                commit: commit.clone(),
            });
            return Some(commit);
        }
    }

    /// Pulls and compares the head commit. Returns the new commit if it changed.
    async fn check(&mut self) -> Option<String> {
        if let Err(e) = self.source.pull().await {
            warn!(error = %e, "pull failed");
        }

        let current = match self.source.head().await {
            Ok(head) => head,
            Err(e) => {
                warn!(error = %e, "failed to read head commit");
                return None;
            }
        };

        if self.last_commit.as_deref() == Some(current.as_str()) {
            return None;
        }

        info!(
            previous = self.last_commit.as_deref().unwrap_or("none"),
            current = %current,
            "new commit detected"
        );
        let previous = self.last_commit.replace(current.clone());
        self.emit(WatchEvent::NewCommit {
            previous,
            current: current.clone(),
        });
        Some(current)
    }

    /// Sleeps for `duration`. Returns `false` if cancelled first.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn cancelled(&self) -> Option<String> {
        self.emit(WatchEvent::Cancelled);
        None
    }

    fn emit(&self, event: WatchEvent) {
        let _ = self.events_tx.try_send(event);
    }
}
