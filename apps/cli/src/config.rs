//! Project configuration.
//!
//! Stored as TOML in the project directory (`gamebuilder.toml`). A missing
//! file is created with defaults on first load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gamebuilder_automate::WatchConfig;
use gamebuilder_presets::BuildTarget;
use serde::{Deserialize, Serialize};

/// File name of the project configuration.
pub const CONFIG_FILE_NAME: &str = "gamebuilder.toml";

/// Project configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Preset model, relative to the project directory.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// File holding the project version string, relative to the project.
    #[serde(default = "default_version_file")]
    pub version_file: PathBuf,

    /// Preferences file. The per-user config directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences_path: Option<PathBuf>,

    /// Terminal program for "open in terminal" on Linux.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub watch: WatchSettings,
}

/// External build engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Program started for every build.
    #[serde(default = "default_engine_program")]
    pub program: String,

    /// Arguments placed before the request file path.
    #[serde(default)]
    pub args: Vec<String>,

    /// Installed targets. Empty means every target is available.
    #[serde(default)]
    pub supported_targets: Vec<BuildTarget>,
}

/// Commit watcher timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Seconds between two checks (at least 2).
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: f64,

    /// Seconds between a new commit and the build.
    #[serde(default = "default_build_timer")]
    pub build_timer_secs: u32,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("ProjectSettings").join("GameBuilder").join("build_settings.json")
}

fn default_version_file() -> PathBuf {
    PathBuf::from("ProjectSettings").join("version.txt")
}

fn default_engine_program() -> String {
    "unity-build".into()
}

fn default_check_interval() -> f64 {
    10.0
}

fn default_build_timer() -> u32 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_engine_program(),
            args: Vec::new(),
            supported_targets: Vec::new(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            build_timer_secs: default_build_timer(),
        }
    }
}

impl WatchSettings {
    pub fn to_watch_config(&self) -> WatchConfig {
        let interval = Some(self.check_interval_secs)
            .filter(|secs| !secs.is_nan())
            .and_then(|secs| Duration::try_from_secs_f64(secs.max(0.0)).ok())
            .unwrap_or(Duration::from_secs_f64(default_check_interval()));
        WatchConfig::new(interval, self.build_timer_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            version_file: default_version_file(),
            preferences_path: None,
            terminal: None,
            engine: EngineConfig::default(),
            watch: WatchSettings::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `project_dir`, or creates a default if not found.
    pub fn load(project_dir: &Path) -> anyhow::Result<Self> {
        let path = config_path(project_dir);

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = Config::default();
            config.save(project_dir)?;
            Ok(config)
        }
    }

    /// Saves the configuration into `project_dir`.
    pub fn save(&self, project_dir: &Path) -> anyhow::Result<()> {
        let path = config_path(project_dir);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Path of the configuration file for a project.
pub fn config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.model_path.ends_with("build_settings.json"));
        assert_eq!(config.engine.program, "unity-build");
        assert!(config.engine.supported_targets.is_empty());
        assert_eq!(config.watch.build_timer_secs, 10);
    }

    #[test]
    fn config_partial_toml() {
        let toml_str = r#"
            [engine]
            program = "/opt/unity/Editor/Unity"
            args = ["-batchmode", "-quit"]
            supported_targets = ["StandaloneLinux64"]
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.program, "/opt/unity/Editor/Unity");
        assert_eq!(config.engine.args, ["-batchmode", "-quit"]);
        assert_eq!(config.engine.supported_targets, [BuildTarget::StandaloneLinux64]);
        assert_eq!(config.version_file, default_version_file());
        assert_eq!(config.watch, WatchSettings::default());
    }

    #[test]
    fn load_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(config_path(tmp.path()).exists());

        let reloaded = Config::load(tmp.path()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn watch_interval_has_a_floor() {
        let settings = WatchSettings {
            check_interval_secs: 0.5,
            build_timer_secs: 3,
        };
        let watch = settings.to_watch_config();
        assert_eq!(watch.check_interval, Duration::from_secs(2));
        assert_eq!(watch.build_timer, 3);
    }

    #[test]
    fn unrepresentable_interval_falls_back_to_default() {
        for secs in [1e30, f64::INFINITY, f64::NAN] {
            let settings = WatchSettings {
                check_interval_secs: secs,
                build_timer_secs: 1,
            };
            assert_eq!(settings.to_watch_config().check_interval, Duration::from_secs(10));
        }
    }
}
