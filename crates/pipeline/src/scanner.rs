//! File scanning for archiving.
//!
//! Recursively walks a build output directory and collects every regular
//! file that is meant to ship.

use std::path::{Path, PathBuf};

use crate::error::BuildError;

/// Path marker excluding a file or folder from shipped archives.
pub const DO_NOT_SHIP_MARKER: &str = "DoNotShip";

/// Scans a directory recursively and returns the files to ship.
///
/// Any path containing [`DO_NOT_SHIP_MARKER`] is skipped, including
/// whole directories. Results are sorted for deterministic archives.
pub fn scan_shippable_files(root_path: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = Vec::new();
    walk_dir(root_path, &mut files)?;
    files.sort();
    Ok(files)
}

/// Total size in bytes of every regular file under `root_path`.
pub fn directory_size(root_path: &Path) -> Result<u64, BuildError> {
    let mut total = 0;
    sum_dir(root_path, &mut total)?;
    Ok(total)
}

fn walk_dir(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), BuildError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        if path.to_string_lossy().contains(DO_NOT_SHIP_MARKER) {
            tracing::trace!(path = %path.display(), "skipping do-not-ship path");
            continue;
        }

        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            walk_dir(&path, files)?;
        } else if metadata.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

fn sum_dir(current: &Path, total: &mut u64) -> Result<(), BuildError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            sum_dir(&entry.path(), total)?;
        } else if metadata.is_file() {
            *total += metadata.len();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_build_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::write(root.join("Game.exe"), b"EXE_CONTENT").unwrap();
        fs::create_dir_all(root.join("Game_Data").join("Managed")).unwrap();
        fs::write(root.join("Game_Data").join("level0"), b"LEVEL").unwrap();
        fs::write(root.join("Game_Data").join("Managed").join("a.dll"), b"DLL").unwrap();

        fs::create_dir_all(root.join("Game_BurstDebugInformation_DoNotShip")).unwrap();
        fs::write(
            root.join("Game_BurstDebugInformation_DoNotShip").join("lib.pdb"),
            b"PDB",
        )
        .unwrap();
        fs::write(root.join("symbols_DoNotShip.txt"), b"SYM").unwrap();

        dir
    }

    #[test]
    fn scan_skips_do_not_ship_paths() {
        let dir = create_build_tree();
        let files = scan_shippable_files(dir.path()).unwrap();

        let rel: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(rel, ["Game.exe", "Game_Data/Managed/a.dll", "Game_Data/level0"]);
    }

    #[test]
    fn scan_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(scan_shippable_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn scan_nonexistent_dir() {
        let result = scan_shippable_files(Path::new("/nonexistent/path/that/does/not/exist"));
        assert!(result.is_err());
    }

    #[test]
    fn size_counts_everything() {
        let dir = create_build_tree();
        let expected = b"EXE_CONTENT".len() + b"LEVEL".len() + b"DLL".len() + 3 + 3;
        assert_eq!(directory_size(dir.path()).unwrap(), expected as u64);
    }
}
