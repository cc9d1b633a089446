//! Post-processors and the registry that builds them from preset data.
//!
//! A preset stores its post-processors as [`PostProcessorSpec`]s (a kind
//! tag plus free-form params). The [`PostProcessorRegistry`] maps each kind
//! to a factory, so new processors are added by registering a factory
//! rather than by runtime type discovery.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use gamebuilder_presets::{BuildPreset, INVALID_PATH, PostProcessorSpec, TemplateArg, resolve};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::BoxFuture;
use crate::engine::{BuildOutcome, BuildResultKind};
use crate::error::BuildError;
use crate::shell::OsShell;

/// Values available to a post-processor besides the build outcome.
pub struct PostBuildContext<'a> {
    pub preset: &'a BuildPreset,
    /// Version string the build was made with.
    pub version: &'a str,
    pub build_number: u64,
    pub shell: &'a dyn OsShell,
}

/// Caller-authored step executed after a successful build.
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn execute<'a>(
        &'a self,
        outcome: &'a BuildOutcome,
        ctx: &'a PostBuildContext<'a>,
    ) -> BoxFuture<'a, Result<(), BuildError>>;

    fn box_clone(&self) -> Box<dyn PostProcessor>;
}

impl Clone for Box<dyn PostProcessor> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Builds a post-processor from its params.
pub type PostProcessorFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Box<dyn PostProcessor>, BuildError> + Send + Sync>;

/// Kind tag → factory table.
#[derive(Clone)]
pub struct PostProcessorRegistry {
    factories: BTreeMap<String, PostProcessorFactory>,
}

impl Default for PostProcessorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PostProcessorRegistry {
    /// Registry without any kinds.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with `shell-command` and `write-manifest`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(ShellCommand::KIND, |params| {
            Ok(Box::new(ShellCommand::from_params(params)?))
        });
        registry.register(WriteManifest::KIND, |params| {
            Ok(Box::new(WriteManifest::from_params(params)?))
        });
        registry
    }

    /// Adds or replaces the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Box<dyn PostProcessor>, BuildError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, spec: &PostProcessorSpec) -> Result<Box<dyn PostProcessor>, BuildError> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| BuildError::UnknownPostProcessor(spec.kind.clone()))?;
        factory(&spec.params)
    }
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

/// Runs a templated command line through the OS shell.
///
/// Placeholders: `{0}` artifact path, `{1}` output directory, `{2}` version,
/// `{3}` build number, `{4}` archive format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellCommand {
    pub command: String,
}

impl ShellCommand {
    pub const KIND: &'static str = "shell-command";

    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn from_params(params: &serde_json::Value) -> Result<Self, BuildError> {
        Ok(serde_json::from_value(params.clone())?)
    }

    /// Command line with every placeholder substituted.
    pub fn render(&self, outcome: &BuildOutcome, ctx: &PostBuildContext<'_>) -> String {
        resolve(
            &self.command,
            &[
                TemplateArg::from(outcome.output_path.display().to_string()),
                TemplateArg::from(outcome.output_dir().display().to_string()),
                TemplateArg::from(ctx.version),
                TemplateArg::from(ctx.build_number),
                TemplateArg::from("zip"),
            ],
        )
    }
}

impl PostProcessor for ShellCommand {
    fn name(&self) -> &str {
        Self::KIND
    }

    fn execute<'a>(
        &'a self,
        outcome: &'a BuildOutcome,
        ctx: &'a PostBuildContext<'a>,
    ) -> BoxFuture<'a, Result<(), BuildError>> {
        Box::pin(async move {
            let command = self.render(outcome, ctx);
            if command == INVALID_PATH || command.trim().is_empty() {
                return Err(BuildError::PostProcessor {
                    name: Self::KIND.into(),
                    message: format!("cannot resolve command template `{}`", self.command),
                });
            }
            let stdout = ctx.shell.run_script(&command).await?;
            info!(command = %command, output = %stdout.trim_end(), "post build command finished");
            Ok(())
        })
    }

    fn box_clone(&self) -> Box<dyn PostProcessor> {
        Box::new(self.clone())
    }
}

/// Writes a JSON summary of the build next to the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteManifest {
    #[serde(default = "default_manifest_name")]
    pub file_name: String,
}

fn default_manifest_name() -> String {
    "build_manifest.json".into()
}

impl Default for WriteManifest {
    fn default() -> Self {
        Self {
            file_name: default_manifest_name(),
        }
    }
}

/// Content of the file written by [`WriteManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub preset: String,
    pub platform: String,
    pub result: BuildResultKind,
    pub output_path: String,
    pub total_duration_seconds: f64,
    pub size_bytes: u64,
    pub version: String,
    pub build_number: u64,
    pub built_at: String,
}

impl WriteManifest {
    pub const KIND: &'static str = "write-manifest";

    fn from_params(params: &serde_json::Value) -> Result<Self, BuildError> {
        if params.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(params.clone())?)
    }

    pub fn manifest_path(&self, outcome: &BuildOutcome) -> std::path::PathBuf {
        outcome.output_dir().join(Path::new(&self.file_name))
    }
}

impl PostProcessor for WriteManifest {
    fn name(&self) -> &str {
        Self::KIND
    }

    fn execute<'a>(
        &'a self,
        outcome: &'a BuildOutcome,
        ctx: &'a PostBuildContext<'a>,
    ) -> BoxFuture<'a, Result<(), BuildError>> {
        Box::pin(async move {
            let manifest = BuildManifest {
                preset: ctx.preset.label.clone(),
                platform: ctx.preset.platform.to_string(),
                result: outcome.result,
                output_path: outcome.output_path.display().to_string(),
                total_duration_seconds: outcome.total_duration_seconds,
                size_bytes: outcome.size_bytes,
                version: ctx.version.to_string(),
                build_number: ctx.build_number,
                built_at: chrono::Utc::now().to_rfc3339(),
            };
            let path = self.manifest_path(outcome);
            let json = serde_json::to_string_pretty(&manifest)?;
            tokio::fs::write(&path, json).await?;
            info!(path = %path.display(), "build manifest written");
            Ok(())
        })
    }

    fn box_clone(&self) -> Box<dyn PostProcessor> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamebuilder_presets::BuildingPlatform;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptShell {
        scripts: Mutex<Vec<String>>,
    }

    impl OsShell for ScriptShell {
        fn open_interactive_shell_at<'a>(
            &'a self,
            _dir: &'a Path,
        ) -> BoxFuture<'a, Result<(), BuildError>> {
            Box::pin(async { Ok(()) })
        }

        fn launch_executable<'a>(
            &'a self,
            _path: &'a Path,
        ) -> BoxFuture<'a, Result<(), BuildError>> {
            Box::pin(async { Ok(()) })
        }

        fn run_script<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<String, BuildError>> {
            self.scripts.lock().unwrap().push(command.to_string());
            Box::pin(async { Ok("done\n".to_string()) })
        }
    }

    fn outcome(path: PathBuf) -> BuildOutcome {
        BuildOutcome {
            result: BuildResultKind::Succeeded,
            output_path: path,
            total_duration_seconds: 12.5,
            size_bytes: 2048,
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = PostProcessorRegistry::default();
        let kinds: Vec<&str> = registry.kinds().collect();
        assert_eq!(kinds, ["shell-command", "write-manifest"]);
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let registry = PostProcessorRegistry::default();
        let spec = PostProcessorSpec::new("upload-to-steam", serde_json::Value::Null);
        assert!(matches!(
            registry.create(&spec),
            Err(BuildError::UnknownPostProcessor(kind)) if kind == "upload-to-steam"
        ));
    }

    #[test]
    fn shell_command_requires_a_command() {
        let registry = PostProcessorRegistry::default();
        let spec = PostProcessorSpec::new("shell-command", serde_json::json!({}));
        assert!(registry.create(&spec).is_err());
    }

    #[tokio::test]
    async fn shell_command_renders_placeholders() {
        let shell = ScriptShell::default();
        let preset = BuildPreset::new("Win", BuildingPlatform::Windows);
        let ctx = PostBuildContext {
            preset: &preset,
            version: "1.4",
            build_number: 9,
            shell: &shell,
        };
        let artifact = PathBuf::from("Builds").join("1.4").join("Game.exe");
        let out = outcome(artifact.clone());

        let processor = PostProcessorRegistry::default()
            .create(&PostProcessorSpec::new(
                "shell-command",
                serde_json::json!({ "command": "upload {0} {1} v{2} #{3} {4}" }),
            ))
            .unwrap();
        processor.execute(&out, &ctx).await.unwrap();

        let expected = format!(
            "upload {} {} v1.4 #9 zip",
            artifact.display(),
            artifact.parent().unwrap().display()
        );
        assert_eq!(*shell.scripts.lock().unwrap(), [expected]);
    }

    #[tokio::test]
    async fn shell_command_with_bad_template_fails() {
        let shell = ScriptShell::default();
        let preset = BuildPreset::default();
        let ctx = PostBuildContext {
            preset: &preset,
            version: "1.0",
            build_number: 1,
            shell: &shell,
        };
        let result = ShellCommand::new("run {7}")
            .execute(&outcome(PathBuf::from("Game.exe")), &ctx)
            .await;
        assert!(matches!(result, Err(BuildError::PostProcessor { .. })));
        assert!(shell.scripts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn manifest_written_next_to_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let shell = ScriptShell::default();
        let preset = BuildPreset::new("Linux Server", BuildingPlatform::LinuxServer);
        let ctx = PostBuildContext {
            preset: &preset,
            version: "3.1",
            build_number: 42,
            shell: &shell,
        };

        let processor = WriteManifest::default().box_clone();
        processor
            .execute(&outcome(dir.path().join("Server.x86_64")), &ctx)
            .await
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("build_manifest.json")).unwrap();
        let manifest: BuildManifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(manifest.preset, "Linux Server");
        assert_eq!(manifest.version, "3.1");
        assert_eq!(manifest.build_number, 42);
        assert_eq!(manifest.size_bytes, 2048);
        assert_eq!(manifest.result, BuildResultKind::Succeeded);
    }
}
