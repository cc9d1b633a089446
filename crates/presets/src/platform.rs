//! Building platforms and their engine-level target mapping.

use serde::{Deserialize, Serialize};

/// Platform a preset builds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildingPlatform {
    #[default]
    Windows,
    WindowsServer,
    Linux,
    LinuxServer,
    Android,
    WebGL,
}

/// Engine build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildTarget {
    StandaloneWindows64,
    StandaloneLinux64,
    Android,
    WebGL,
}

/// Engine target group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetGroup {
    Standalone,
    Android,
    WebGL,
}

/// Player/Server variant of a standalone target.
///
/// Platforms without a variant pass `None` (engine value 0) through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subtarget {
    None,
    Server,
    Player,
}

impl Subtarget {
    /// Numeric value the engine expects.
    pub fn as_i32(self) -> i32 {
        match self {
            Subtarget::None => 0,
            Subtarget::Server => 1,
            Subtarget::Player => 2,
        }
    }
}

impl BuildingPlatform {
    pub fn all() -> &'static [BuildingPlatform] {
        &[
            BuildingPlatform::Windows,
            BuildingPlatform::WindowsServer,
            BuildingPlatform::Linux,
            BuildingPlatform::LinuxServer,
            BuildingPlatform::Android,
            BuildingPlatform::WebGL,
        ]
    }

    /// Extension of the produced artifact, including the leading dot.
    pub fn file_extension(self) -> &'static str {
        match self {
            BuildingPlatform::Windows | BuildingPlatform::WindowsServer => ".exe",
            BuildingPlatform::Linux | BuildingPlatform::LinuxServer | BuildingPlatform::WebGL => "",
            BuildingPlatform::Android => ".apk",
        }
    }

    /// Extension of the compressed archive. Always zip.
    pub fn archive_extension(self) -> &'static str {
        ".zip"
    }

    pub fn build_target(self) -> BuildTarget {
        match self {
            BuildingPlatform::Windows | BuildingPlatform::WindowsServer => {
                BuildTarget::StandaloneWindows64
            }
            BuildingPlatform::Linux | BuildingPlatform::LinuxServer => {
                BuildTarget::StandaloneLinux64
            }
            BuildingPlatform::Android => BuildTarget::Android,
            BuildingPlatform::WebGL => BuildTarget::WebGL,
        }
    }

    pub fn subtarget(self) -> Subtarget {
        match self {
            BuildingPlatform::Windows | BuildingPlatform::Linux => Subtarget::Player,
            BuildingPlatform::WindowsServer | BuildingPlatform::LinuxServer => Subtarget::Server,
            BuildingPlatform::Android | BuildingPlatform::WebGL => Subtarget::None,
        }
    }

    pub fn target_group(self) -> TargetGroup {
        match self {
            BuildingPlatform::Windows
            | BuildingPlatform::WindowsServer
            | BuildingPlatform::Linux
            | BuildingPlatform::LinuxServer => TargetGroup::Standalone,
            BuildingPlatform::Android => TargetGroup::Android,
            BuildingPlatform::WebGL => TargetGroup::WebGL,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BuildingPlatform::Windows => "Windows",
            BuildingPlatform::WindowsServer => "Windows Server",
            BuildingPlatform::Linux => "Linux",
            BuildingPlatform::LinuxServer => "Linux Server",
            BuildingPlatform::Android => "Android",
            BuildingPlatform::WebGL => "WebGL",
        }
    }
}

impl std::fmt::Display for BuildingPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
