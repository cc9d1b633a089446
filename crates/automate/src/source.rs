//! Source-control access.

use std::path::PathBuf;
use std::process::Stdio;

use crate::BoxFuture;
use crate::error::WatchError;

/// Something that can be updated and reports its head commit.
pub trait CommitSource: Send + Sync {
    /// Fetches and merges upstream changes.
    fn pull(&self) -> BoxFuture<'_, Result<(), WatchError>>;

    /// Current head commit identifier.
    fn head(&self) -> BoxFuture<'_, Result<String, WatchError>>;
}

/// Git working copy queried through the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCommitSource {
    repo_dir: PathBuf,
}

impl GitCommitSource {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String, WatchError> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(WatchError::Git {
                command: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl CommitSource for GitCommitSource {
    fn pull(&self) -> BoxFuture<'_, Result<(), WatchError>> {
        Box::pin(async move {
            let out = self.git(&["pull"]).await?;
            tracing::debug!(output = %out, "git pull");
            Ok(())
        })
    }

    fn head(&self) -> BoxFuture<'_, Result<String, WatchError>> {
        Box::pin(async move { self.git(&["rev-parse", "HEAD"]).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn git_outside_a_repository_fails() {
        let source = GitCommitSource::new("/nonexistent/path/that/does/not/exist");
        assert!(source.head().await.is_err());
    }
}
