//! Operating-system shell collaborator.

use std::path::Path;
use std::process::Stdio;

use crate::BoxFuture;
use crate::error::BuildError;

/// Process-launching operations used by the post-build pipeline.
pub trait OsShell: Send + Sync {
    /// Opens an interactive terminal with `dir` as working directory.
    fn open_interactive_shell_at<'a>(
        &'a self,
        dir: &'a Path,
    ) -> BoxFuture<'a, Result<(), BuildError>>;

    /// Starts an executable without waiting for it to exit.
    fn launch_executable<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<(), BuildError>>;

    /// Runs a command line through the platform shell and returns its stdout.
    fn run_script<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<String, BuildError>>;
}

/// [`OsShell`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemShell {
    /// Terminal program used on Linux. Falls back to `$TERMINAL`, then
    /// `x-terminal-emulator`.
    pub terminal: Option<String>,
}

impl SystemShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terminal(terminal: impl Into<String>) -> Self {
        Self {
            terminal: Some(terminal.into()),
        }
    }

    #[cfg(target_os = "windows")]
    fn terminal_command(&self, dir: &Path) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("cmd");
        cmd.arg("/k").arg(format!("cd \"{}\"", dir.display()));
        cmd
    }

    #[cfg(target_os = "macos")]
    fn terminal_command(&self, dir: &Path) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("open");
        cmd.args(["-a", self.terminal.as_deref().unwrap_or("Terminal")])
            .arg(dir);
        cmd
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    fn terminal_command(&self, dir: &Path) -> tokio::process::Command {
        let program = self
            .terminal
            .clone()
            .or_else(|| std::env::var("TERMINAL").ok())
            .unwrap_or_else(|| "x-terminal-emulator".into());
        let mut cmd = tokio::process::Command::new(program);
        cmd.current_dir(dir);
        cmd
    }
}

fn script_command(command: &str) -> tokio::process::Command {
    #[cfg(target_os = "windows")]
    {
        let mut cmd = tokio::process::Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }

    #[cfg(not(target_os = "windows"))]
    {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

impl OsShell for SystemShell {
    fn open_interactive_shell_at<'a>(
        &'a self,
        dir: &'a Path,
    ) -> BoxFuture<'a, Result<(), BuildError>> {
        Box::pin(async move {
            self.terminal_command(dir)
                .stdin(Stdio::null())
                .spawn()
                .map_err(|e| {
                    BuildError::Shell(format!("failed to open terminal at {}: {e}", dir.display()))
                })?;
            Ok(())
        })
    }

    fn launch_executable<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<(), BuildError>> {
        Box::pin(async move {
            let mut cmd = tokio::process::Command::new(path);
            if let Some(dir) = path.parent()
                && !dir.as_os_str().is_empty()
            {
                cmd.current_dir(dir);
            }
            cmd.stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| {
                    BuildError::Shell(format!("failed to launch {}: {e}", path.display()))
                })?;
            Ok(())
        })
    }

    fn run_script<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<String, BuildError>> {
        Box::pin(async move {
            let output = script_command(command)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| BuildError::Shell(format!("failed to run `{command}`: {e}")))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(BuildError::Shell(format!(
                    "`{command}` exited with {}: {}",
                    output.status,
                    stderr.trim()
                )));
            }

            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_script_returns_stdout() {
        let out = SystemShell::new().run_script("echo hello").await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn run_script_reports_failure() {
        let err = SystemShell::new().run_script("exit 3").await.unwrap_err();
        assert!(matches!(err, BuildError::Shell(_)));
    }

    #[tokio::test]
    async fn launching_missing_executable_fails() {
        let result = SystemShell::new()
            .launch_executable(Path::new("/nonexistent/dir/Game.x86_64"))
            .await;
        assert!(result.is_err());
    }
}
