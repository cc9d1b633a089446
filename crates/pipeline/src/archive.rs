//! Archiver collaborator and the zip implementation.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use gamebuilder_presets::CompressionLevel;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::BoxFuture;
use crate::error::BuildError;

/// Packs files into an archive, replacing any archive already at `output`.
pub trait Archiver: Send + Sync {
    fn create_archive<'a>(
        &'a self,
        files: &'a [PathBuf],
        output: &'a Path,
        level: CompressionLevel,
    ) -> BoxFuture<'a, Result<(), BuildError>>;
}

/// Writes `.zip` archives with the `zip` crate.
///
/// Entries are named relative to the archive's directory when the files
/// live below it, otherwise relative to the files' common ancestor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn create_archive<'a>(
        &'a self,
        files: &'a [PathBuf],
        output: &'a Path,
        level: CompressionLevel,
    ) -> BoxFuture<'a, Result<(), BuildError>> {
        let files = files.to_vec();
        let output = output.to_path_buf();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || write_zip(&files, &output, level))
                .await
                .map_err(|e| BuildError::Archive(format!("task join error: {e}")))?
        })
    }
}

fn file_options(level: CompressionLevel) -> SimpleFileOptions {
    let options = SimpleFileOptions::default();
    match level {
        CompressionLevel::NoCompression => options.compression_method(CompressionMethod::Stored),
        CompressionLevel::Fastest => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(1)),
        CompressionLevel::Optimal => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(6)),
        CompressionLevel::SmallestSize => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9)),
    }
}

fn write_zip(files: &[PathBuf], output: &Path, level: CompressionLevel) -> Result<(), BuildError> {
    if files.is_empty() {
        tracing::debug!(archive = %output.display(), "nothing to archive");
        return Ok(());
    }

    if output.exists() {
        fs::remove_file(output)?;
    }
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let root = entry_root(files, output);
    let options = file_options(level);
    let mut zip = zip::ZipWriter::new(fs::File::create(output)?);

    for path in files {
        if !path.is_file() {
            continue;
        }
        let rel = path.strip_prefix(&root).unwrap_or(path);
        let name = rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
        zip.start_file(name, options)?;
        let mut rf = fs::File::open(path)?;
        io::copy(&mut rf, &mut zip)?;
    }

    zip.finish()?.flush()?;
    tracing::debug!(archive = %output.display(), files = files.len(), "archive written");
    Ok(())
}

fn entry_root(files: &[PathBuf], output: &Path) -> PathBuf {
    if let Some(dir) = output.parent()
        && files.iter().all(|f| f.starts_with(dir))
    {
        return dir.to_path_buf();
    }

    let mut root = files[0].parent().map(Path::to_path_buf).unwrap_or_default();
    for file in &files[1..] {
        while !file.starts_with(&root) {
            if !root.pop() {
                return PathBuf::new();
            }
        }
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry_names(archive: &Path) -> Vec<String> {
        let mut z = zip::ZipArchive::new(fs::File::open(archive).unwrap()).unwrap();
        let mut names: Vec<String> = (0..z.len())
            .map(|i| z.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn zips_files_relative_to_archive_dir() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("1.0");
        fs::create_dir_all(build.join("Data")).unwrap();
        fs::write(build.join("Game.exe"), b"EXE").unwrap();
        fs::write(build.join("Data").join("level0"), b"LEVEL").unwrap();

        let files = vec![build.join("Data").join("level0"), build.join("Game.exe")];
        let out = dir.path().join("Game-1.0.zip");
        ZipArchiver
            .create_archive(&files, &out, CompressionLevel::SmallestSize)
            .await
            .unwrap();

        assert_eq!(entry_names(&out), ["1.0/Data/level0", "1.0/Game.exe"]);

        let mut z = zip::ZipArchive::new(fs::File::open(&out).unwrap()).unwrap();
        let mut content = String::new();
        z.by_name("1.0/Game.exe")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "EXE");
    }

    #[tokio::test]
    async fn replaces_existing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("build");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), b"A").unwrap();

        let out = dir.path().join("zips").join("out.zip");
        fs::create_dir_all(out.parent().unwrap()).unwrap();
        fs::write(&out, b"stale").unwrap();

        ZipArchiver
            .create_archive(&[src.join("a.txt")], &out, CompressionLevel::NoCompression)
            .await
            .unwrap();

        assert_eq!(entry_names(&out), ["a.txt"]);
    }

    #[tokio::test]
    async fn empty_file_list_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.zip");
        ZipArchiver
            .create_archive(&[], &out, CompressionLevel::Optimal)
            .await
            .unwrap();
        assert!(!out.exists());
    }
}
