//! Engine build option flags.
//!
//! The bits are opaque to the build logic: they are passed through to the
//! engine unchanged. The only thing done with them here is describing
//! which flags are set.

use serde::{Deserialize, Serialize};

/// Bitset of engine build options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildOptions(pub u32);

impl BuildOptions {
    pub const NONE: Self = Self(0);
    pub const DEVELOPMENT: Self = Self(1 << 0);
    pub const AUTO_RUN_PLAYER: Self = Self(1 << 2);
    pub const SHOW_BUILT_PLAYER: Self = Self(1 << 3);
    pub const BUILD_ADDITIONAL_STREAMED_SCENES: Self = Self(1 << 4);
    pub const ACCEPT_EXTERNAL_MODIFICATIONS_TO_PLAYER: Self = Self(1 << 5);
    pub const INSTALL_IN_BUILD_FOLDER: Self = Self(1 << 6);
    pub const CLEAN_BUILD_CACHE: Self = Self(1 << 7);
    pub const CONNECT_WITH_PROFILER: Self = Self(1 << 8);
    pub const ALLOW_DEBUGGING: Self = Self(1 << 9);
    pub const SYMLINK_SOURCES: Self = Self(1 << 10);
    pub const UNCOMPRESSED_ASSET_BUNDLE: Self = Self(1 << 11);
    pub const CONNECT_TO_HOST: Self = Self(1 << 12);
    pub const CUSTOM_CONNECTION_ID: Self = Self(1 << 13);
    pub const BUILD_SCRIPTS_ONLY: Self = Self(1 << 15);
    pub const PATCH_PACKAGE: Self = Self(1 << 16);
    pub const FORCE_ENABLE_ASSERTIONS: Self = Self(1 << 17);
    pub const COMPRESS_WITH_LZ4: Self = Self(1 << 18);
    pub const COMPRESS_WITH_LZ4_HC: Self = Self(1 << 19);
    pub const COMPUTE_CRC: Self = Self(1 << 20);
    pub const STRICT_MODE: Self = Self(1 << 21);
    pub const INCLUDE_TEST_ASSEMBLIES: Self = Self(1 << 22);
    pub const NO_UNIQUE_IDENTIFIER: Self = Self(1 << 23);
    pub const WAIT_FOR_PLAYER_CONNECTION: Self = Self(1 << 25);
    pub const ENABLE_CODE_COVERAGE: Self = Self(1 << 26);
    pub const ENABLE_DEEP_PROFILING_SUPPORT: Self = Self(1 << 28);
    pub const DETAILED_BUILD_REPORT: Self = Self(1 << 29);
    pub const SHADER_LIVELINK_SUPPORT: Self = Self(1 << 30);

    const TABLE: &'static [(BuildOptions, &'static str, &'static str)] = &[
        (Self::DEVELOPMENT, "Development", "Build a development version of the player."),
        (Self::AUTO_RUN_PLAYER, "AutoRunPlayer", "Run the built player."),
        (Self::SHOW_BUILT_PLAYER, "ShowBuiltPlayer", "Show the built player."),
        (
            Self::BUILD_ADDITIONAL_STREAMED_SCENES,
            "BuildAdditionalStreamedScenes",
            "Build a compressed asset bundle that contains streamed scenes.",
        ),
        (
            Self::ACCEPT_EXTERNAL_MODIFICATIONS_TO_PLAYER,
            "AcceptExternalModificationsToPlayer",
            "Used when building exported platform projects.",
        ),
        (Self::INSTALL_IN_BUILD_FOLDER, "InstallInBuildFolder", ""),
        (
            Self::CLEAN_BUILD_CACHE,
            "CleanBuildCache",
            "Clear all cached build results, resulting in a full rebuild of all scripts and all player data.",
        ),
        (
            Self::CONNECT_WITH_PROFILER,
            "ConnectWithProfiler",
            "Start the player with a connection to the profiler in the editor.",
        ),
        (
            Self::ALLOW_DEBUGGING,
            "AllowDebugging",
            "Allow script debuggers to attach to the player remotely.",
        ),
        (
            Self::SYMLINK_SOURCES,
            "SymlinkSources",
            "Symlink sources when generating the project.",
        ),
        (
            Self::UNCOMPRESSED_ASSET_BUNDLE,
            "UncompressedAssetBundle",
            "Don't compress the data when creating the asset bundle.",
        ),
        (Self::CONNECT_TO_HOST, "ConnectToHost", "Sets the player to connect to the editor."),
        (
            Self::CUSTOM_CONNECTION_ID,
            "CustomConnectionID",
            "Determines if the player should be using the custom connection ID.",
        ),
        (Self::BUILD_SCRIPTS_ONLY, "BuildScriptsOnly", "Only build the scripts in a project."),
        (
            Self::PATCH_PACKAGE,
            "PatchPackage",
            "Patch a development app package rather than completely rebuilding it. Supported platforms: Android.",
        ),
        (
            Self::FORCE_ENABLE_ASSERTIONS,
            "ForceEnableAssertions",
            "Include assertions in the build. By default, the assertions are only included in development builds.",
        ),
        (
            Self::COMPRESS_WITH_LZ4,
            "CompressWithLz4",
            "Use chunk-based LZ4 compression when building the player.",
        ),
        (
            Self::COMPRESS_WITH_LZ4_HC,
            "CompressWithLz4HC",
            "Use chunk-based LZ4 high-compression when building the player.",
        ),
        (Self::COMPUTE_CRC, "ComputeCRC", ""),
        (
            Self::STRICT_MODE,
            "StrictMode",
            "Do not allow the build to succeed if any errors are reported during it.",
        ),
        (
            Self::INCLUDE_TEST_ASSEMBLIES,
            "IncludeTestAssemblies",
            "Build will include assemblies for testing.",
        ),
        (
            Self::NO_UNIQUE_IDENTIFIER,
            "NoUniqueIdentifier",
            "Will force the build GUID to all zeros.",
        ),
        (
            Self::WAIT_FOR_PLAYER_CONNECTION,
            "WaitForPlayerConnection",
            "Sets the player to wait for player connection on player start.",
        ),
        (Self::ENABLE_CODE_COVERAGE, "EnableCodeCoverage", "Enables code coverage."),
        (
            Self::ENABLE_DEEP_PROFILING_SUPPORT,
            "EnableDeepProfilingSupport",
            "Enables deep profiling support in the player.",
        ),
        (
            Self::DETAILED_BUILD_REPORT,
            "DetailedBuildReport",
            "Generates more information in the build report.",
        ),
        (
            Self::SHADER_LIVELINK_SUPPORT,
            "ShaderLivelinkSupport",
            "Enable shader livelink support.",
        ),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit of `other` is set in `self`.
    pub fn contains(self, other: BuildOptions) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: BuildOptions) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: BuildOptions) {
        self.0 &= !other.0;
    }

    /// Names of the set flags, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        if self == Self::NONE {
            return vec!["None"];
        }
        Self::TABLE
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, name, _)| *name)
            .collect()
    }

    /// Human-readable description of every set flag, one block per flag.
    pub fn describe(self) -> String {
        if self == Self::NONE {
            return "None:\n    Perform the specified build without any special settings or extra tasks.\n"
                .to_string();
        }
        let mut out = String::new();
        for (flag, name, description) in Self::TABLE {
            if self.contains(*flag) {
                out.push_str(name);
                out.push_str(":\n    ");
                out.push_str(description);
                out.push('\n');
            }
        }
        out
    }
}

impl std::ops::BitOr for BuildOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_describes_as_none() {
        assert_eq!(BuildOptions::NONE.names(), vec!["None"]);
        assert!(BuildOptions::NONE.describe().starts_with("None:"));
    }

    #[test]
    fn describe_lists_only_set_flags() {
        let opts = BuildOptions::DEVELOPMENT | BuildOptions::STRICT_MODE;
        assert_eq!(opts.names(), vec!["Development", "StrictMode"]);
        let text = opts.describe();
        assert!(text.contains("Development:\n    Build a development version"));
        assert!(text.contains("StrictMode:"));
        assert!(!text.contains("AllowDebugging"));
    }

    #[test]
    fn insert_and_remove() {
        let mut opts = BuildOptions::NONE;
        opts.insert(BuildOptions::ALLOW_DEBUGGING);
        assert!(opts.contains(BuildOptions::ALLOW_DEBUGGING));
        opts.remove(BuildOptions::ALLOW_DEBUGGING);
        assert_eq!(opts, BuildOptions::NONE);
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&BuildOptions::DEVELOPMENT).unwrap();
        assert_eq!(json, "1");
    }
}
