//! Build target platforms and artifact path rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A platform a build artifact can be produced for
///
/// The identifier spelling is shared between configuration files, template
/// substitution and the backend command line, so it is fixed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildTarget {
    StandaloneWindows,
    StandaloneWindows64,
    StandaloneOSX,
    StandaloneLinux64,
    #[serde(rename = "iOS")]
    Ios,
    Android,
    WebGL,
    GameCoreXboxOne,
    GameCoreXboxSeries,
}

impl BuildTarget {
    /// Every known target, in declaration order
    pub const ALL: [BuildTarget; 9] = [
        BuildTarget::StandaloneWindows,
        BuildTarget::StandaloneWindows64,
        BuildTarget::StandaloneOSX,
        BuildTarget::StandaloneLinux64,
        BuildTarget::Ios,
        BuildTarget::Android,
        BuildTarget::WebGL,
        BuildTarget::GameCoreXboxOne,
        BuildTarget::GameCoreXboxSeries,
    ];

    /// The identifier used in config files, templates and backend args
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::StandaloneWindows => "StandaloneWindows",
            BuildTarget::StandaloneWindows64 => "StandaloneWindows64",
            BuildTarget::StandaloneOSX => "StandaloneOSX",
            BuildTarget::StandaloneLinux64 => "StandaloneLinux64",
            BuildTarget::Ios => "iOS",
            BuildTarget::Android => "Android",
            BuildTarget::WebGL => "WebGL",
            BuildTarget::GameCoreXboxOne => "GameCoreXboxOne",
            BuildTarget::GameCoreXboxSeries => "GameCoreXboxSeries",
        }
    }

    /// Suffix appended to the artifact leaf when resolving an output path.
    ///
    /// Windows desktop builds get `.exe`. The macOS, iOS and Xbox families
    /// explicitly get none: the OS or packaging convention owns the extension
    /// there (e.g. the `.app` bundle the backend produces next to the
    /// returned path). Everything else also gets none.
    pub fn artifact_suffix(&self) -> Option<&'static str> {
        match self {
            BuildTarget::StandaloneWindows | BuildTarget::StandaloneWindows64 => Some(".exe"),
            BuildTarget::StandaloneOSX
            | BuildTarget::Ios
            | BuildTarget::GameCoreXboxSeries
            | BuildTarget::GameCoreXboxOne => None,
            _ => None,
        }
    }

    /// Apply the artifact-suffix policy to a resolved output path.
    ///
    /// Idempotent: a leaf that already carries the suffix is left alone.
    pub fn artifact_path(&self, path: &Path) -> PathBuf {
        match self.artifact_suffix() {
            Some(suffix) => ensure_suffix(path, suffix),
            None => path.to_path_buf(),
        }
    }

    /// Path of the launchable executable for an artifact at `path`.
    ///
    /// Suffixing is idempotent: a path that already carries the expected
    /// extension is returned unchanged.
    pub fn executable_path(&self, path: &Path) -> PathBuf {
        match self {
            BuildTarget::StandaloneWindows | BuildTarget::StandaloneWindows64 => {
                ensure_suffix(path, ".exe")
            }
            BuildTarget::StandaloneOSX => ensure_suffix(path, ".app"),
            _ => path.to_path_buf(),
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildTarget::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = BuildTarget::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown build target '{}' (known: {})", s, known.join(", "))
            })
    }
}

/// Whether a build artifact already exists at `path`.
///
/// Checks the path as a file, as a directory, and as the `.app` bundle
/// directory variant the macOS backend produces.
pub fn build_exists(path: &Path) -> bool {
    if path.is_file() || path.is_dir() {
        return true;
    }
    let mut bundle = path.as_os_str().to_os_string();
    bundle.push(".app");
    PathBuf::from(bundle).is_dir()
}

fn ensure_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path.as_os_str().to_string_lossy();
    if name.ends_with(suffix) {
        path.to_path_buf()
    } else {
        PathBuf::from(format!("{}{}", name, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_targets_get_exe_suffix() {
        assert_eq!(BuildTarget::StandaloneWindows.artifact_suffix(), Some(".exe"));
        assert_eq!(BuildTarget::StandaloneWindows64.artifact_suffix(), Some(".exe"));
    }

    #[test]
    fn test_bundle_and_console_targets_get_no_suffix() {
        assert_eq!(BuildTarget::StandaloneOSX.artifact_suffix(), None);
        assert_eq!(BuildTarget::Ios.artifact_suffix(), None);
        assert_eq!(BuildTarget::GameCoreXboxOne.artifact_suffix(), None);
        assert_eq!(BuildTarget::GameCoreXboxSeries.artifact_suffix(), None);
    }

    #[test]
    fn test_remaining_targets_get_no_suffix() {
        assert_eq!(BuildTarget::StandaloneLinux64.artifact_suffix(), None);
        assert_eq!(BuildTarget::Android.artifact_suffix(), None);
        assert_eq!(BuildTarget::WebGL.artifact_suffix(), None);
    }

    #[test]
    fn test_artifact_path_only_suffixes_windows() {
        let base = Path::new("out/Game");
        assert_eq!(
            BuildTarget::StandaloneWindows64.artifact_path(base),
            PathBuf::from("out/Game.exe")
        );
        assert_eq!(
            BuildTarget::StandaloneWindows64.artifact_path(Path::new("out/Game.exe")),
            PathBuf::from("out/Game.exe")
        );
        // macOS artifact paths stay bare; the backend produces the bundle
        assert_eq!(
            BuildTarget::StandaloneOSX.artifact_path(base),
            PathBuf::from("out/Game")
        );
        assert_eq!(
            BuildTarget::WebGL.artifact_path(base),
            PathBuf::from("out/Game")
        );
    }

    #[test]
    fn test_executable_path_appends_exactly_once() {
        let target = BuildTarget::StandaloneWindows64;
        let plain = target.executable_path(Path::new("out/Game"));
        assert_eq!(plain, PathBuf::from("out/Game.exe"));

        let already = target.executable_path(Path::new("out/Game.exe"));
        assert_eq!(already, PathBuf::from("out/Game.exe"));
    }

    #[test]
    fn test_executable_path_osx_bundle() {
        let target = BuildTarget::StandaloneOSX;
        assert_eq!(
            target.executable_path(Path::new("out/Game")),
            PathBuf::from("out/Game.app")
        );
        assert_eq!(
            target.executable_path(Path::new("out/Game.app")),
            PathBuf::from("out/Game.app")
        );
    }

    #[test]
    fn test_executable_path_passthrough_for_other_targets() {
        let target = BuildTarget::Android;
        assert_eq!(
            target.executable_path(Path::new("out/Game")),
            PathBuf::from("out/Game")
        );
    }

    #[test]
    fn test_build_exists_probes_file_dir_and_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        assert!(!build_exists(&root.join("missing")));

        let file = root.join("Game.exe");
        std::fs::write(&file, b"bin").unwrap();
        assert!(build_exists(&file));

        let folder = root.join("GameDir");
        std::fs::create_dir(&folder).unwrap();
        assert!(build_exists(&folder));

        std::fs::create_dir(root.join("Mac.app")).unwrap();
        assert!(build_exists(&root.join("Mac")));
    }

    #[test]
    fn test_serde_spelling_round_trip() {
        let yaml = serde_yaml::to_string(&BuildTarget::Ios).unwrap();
        assert_eq!(yaml.trim(), "iOS");
        let back: BuildTarget = serde_yaml::from_str("iOS").unwrap();
        assert_eq!(back, BuildTarget::Ios);

        let win: BuildTarget = serde_yaml::from_str("StandaloneWindows64").unwrap();
        assert_eq!(win, BuildTarget::StandaloneWindows64);
    }

    #[test]
    fn test_from_str_rejects_unknown_target() {
        assert!(BuildTarget::from_str("StandaloneWindows64").is_ok());
        let err = BuildTarget::from_str("Windows").unwrap_err();
        assert!(err.contains("unknown build target"));
    }
}
