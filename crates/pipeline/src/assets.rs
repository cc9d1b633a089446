//! Asset resolution: scene references and the persisted preset model.

use std::path::PathBuf;
use std::time::Duration;

use gamebuilder_presets::{BuildPreset, ModelRepository, PresetsError, SceneRef};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::busy::BusyTracker;
use crate::error::BuildError;

/// Delay between two attempts at loading the model.
pub const MODEL_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Maps opaque scene references to filesystem paths.
pub trait SceneResolver: Send + Sync {
    fn scene_path(&self, scene: &SceneRef) -> Result<PathBuf, BuildError>;
}

/// Loads the preset model, creating an empty one when none exists.
///
/// Failures are logged and retried every `retry_delay` until the load
/// succeeds or `cancel` fires, in which case `None` is returned. The
/// operation is registered in `busy` for its whole duration.
pub async fn load_or_create_model(
    repo: &dyn ModelRepository,
    busy: &BusyTracker,
    cancel: &CancellationToken,
    retry_delay: Duration,
) -> Option<Vec<BuildPreset>> {
    let _guard = busy.begin("loading build settings");

    loop {
        if cancel.is_cancelled() {
            return None;
        }

        match try_load(repo) {
            Ok(Some(presets)) => {
                info!(
                    location = %repo.location(),
                    presets = presets.len(),
                    "build settings loaded"
                );
                return Some(presets);
            }
            Ok(None) => warn!(
                location = %repo.location(),
                retry_ms = retry_delay.as_millis() as u64,
                "build settings missing after creation, retrying"
            ),
            Err(e) => warn!(
                location = %repo.location(),
                error = %e,
                retry_ms = retry_delay.as_millis() as u64,
                "error while fetching build settings, retrying"
            ),
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(retry_delay) => {}
        }
    }
}

fn try_load(repo: &dyn ModelRepository) -> Result<Option<Vec<BuildPreset>>, PresetsError> {
    if let Some(presets) = repo.load()? {
        return Ok(Some(presets));
    }
    info!(location = %repo.location(), "no build settings found, creating");
    repo.create()?;
    repo.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamebuilder_presets::{BuildingPlatform, JsonModelRepository};
    use std::sync::Mutex;

    /// Repository that fails a fixed number of loads first.
    struct FlakyRepo {
        failures_left: Mutex<u32>,
        loads: Mutex<u32>,
    }

    impl FlakyRepo {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: Mutex::new(failures),
                loads: Mutex::new(0),
            }
        }
    }

    impl ModelRepository for FlakyRepo {
        fn load(&self) -> Result<Option<Vec<BuildPreset>>, PresetsError> {
            *self.loads.lock().unwrap() += 1;
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(PresetsError::Io(std::io::Error::other("asset database busy")));
            }
            Ok(Some(vec![BuildPreset::new("Win", BuildingPlatform::Windows)]))
        }

        fn create(&self) -> Result<(), PresetsError> {
            Ok(())
        }

        fn save(&self, _presets: &[BuildPreset]) -> Result<(), PresetsError> {
            Ok(())
        }

        fn location(&self) -> String {
            "flaky".into()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_loaded() {
        let repo = FlakyRepo::new(3);
        let busy = BusyTracker::new();
        let cancel = CancellationToken::new();

        let presets = load_or_create_model(&repo, &busy, &cancel, MODEL_RETRY_DELAY)
            .await
            .unwrap();

        assert_eq!(presets.len(), 1);
        assert_eq!(*repo.loads.lock().unwrap(), 4);
        assert!(!busy.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_retrying() {
        let repo = FlakyRepo::new(u32::MAX);
        let busy = BusyTracker::new();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            canceller.cancel();
        });

        let result = load_or_create_model(&repo, &busy, &cancel, MODEL_RETRY_DELAY).await;
        assert!(result.is_none());
        assert_eq!(*repo.loads.lock().unwrap(), 3);
        assert!(!busy.is_busy());
    }

    #[tokio::test]
    async fn creates_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonModelRepository::new(dir.path().join("GameBuilderModel.json"));

        let presets = load_or_create_model(
            &repo,
            &BusyTracker::new(),
            &CancellationToken::new(),
            MODEL_RETRY_DELAY,
        )
        .await
        .unwrap();

        assert!(presets.is_empty());
        assert!(repo.path().exists());
    }
}
