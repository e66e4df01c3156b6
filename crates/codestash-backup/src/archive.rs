//! Archive creation for completed backup directories.
//!
//! The archive is named after the backup directory and its entries are
//! relative to the directory's parent, so extraction reproduces the
//! `Backup-<stamp>/...` layout.

use crate::cancel::CancelToken;
use crate::error::{BackupError, Result};
use crate::scanning::relative_display;
use codestash_core::types::DEFAULT_COMPRESSION_LEVEL;
use codestash_core::ArchiveFormat;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tar::Builder as TarBuilder;
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Outcome of archiving one backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveResult {
    /// Path to the created archive
    pub archive_path: PathBuf,

    /// Size of the archive in bytes
    pub size_bytes: u64,

    /// Number of files stored
    pub entry_count: usize,

    /// SHA-256 of the archive, lowercase hex
    pub checksum: String,
}

/// Configuration for archive creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveConfig {
    pub format: ArchiveFormat,

    /// Compression level (0-9)
    pub compression_level: u32,
}

impl ArchiveConfig {
    pub fn new(format: ArchiveFormat) -> Self {
        Self {
            format,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Sets the compression level, clamped to 0-9.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self::new(ArchiveFormat::Zip)
    }
}

/// Archive builder for backup directories.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    config: ArchiveConfig,
}

impl ArchiveBuilder {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    /// Path the archive of `backup_dir` will have inside `output_dir`.
    pub fn archive_path(&self, backup_dir: &Path, output_dir: &Path) -> PathBuf {
        let name = backup_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backup".to_string());
        output_dir.join(format!("{}{}", name, self.config.format.extension()))
    }

    /// Archive every file under `backup_dir` into `output_dir`, creating the
    /// output directory if needed. Cancellation is checked before each file.
    pub fn create(
        &self,
        backup_dir: &Path,
        output_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<ArchiveResult> {
        cancel.check()?;
        if !backup_dir.is_dir() {
            return Err(BackupError::io(format!(
                "Backup directory does not exist: {}",
                backup_dir.display()
            )));
        }
        fs::create_dir_all(output_dir)?;

        let base = backup_dir.parent().unwrap_or(backup_dir);
        let files = collect_files(backup_dir)?;
        let archive_path = self.archive_path(backup_dir, output_dir);

        tracing::debug!(
            "Archiving {} files into {}",
            files.len(),
            archive_path.display()
        );

        // Written under a temporary name and moved into place only when
        // complete; an interrupted archive is removed when `partial` drops.
        let partial = tempfile::Builder::new()
            .prefix(".codestash-")
            .suffix(".partial")
            .tempfile_in(output_dir)?;
        let partial = match self.config.format {
            ArchiveFormat::Zip => self.write_zip(partial, base, &files, cancel)?,
            ArchiveFormat::TarGz => self.write_tar_gz(partial, base, &files, cancel)?,
        };
        partial.persist(&archive_path).map_err(io::Error::from)?;

        Ok(ArchiveResult {
            size_bytes: fs::metadata(&archive_path)?.len(),
            entry_count: files.len(),
            checksum: calculate_checksum(&archive_path)?,
            archive_path,
        })
    }

    fn write_zip(
        &self,
        out: NamedTempFile,
        base: &Path,
        files: &[PathBuf],
        cancel: &CancelToken,
    ) -> Result<NamedTempFile> {
        let level = self.config.compression_level;
        let method = if level == 0 {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let mut options = SimpleFileOptions::default().compression_method(method);
        if level > 0 {
            options = options.compression_level(Some(level as _));
        }

        let mut zip = ZipWriter::new(out);
        for path in files {
            cancel.check()?;
            zip.start_file(relative_display(path, base), options)?;
            io::copy(&mut File::open(path)?, &mut zip)?;
        }
        Ok(zip.finish()?)
    }

    fn write_tar_gz(
        &self,
        out: NamedTempFile,
        base: &Path,
        files: &[PathBuf],
        cancel: &CancelToken,
    ) -> Result<NamedTempFile> {
        let encoder = GzEncoder::new(
            BufWriter::new(out),
            Compression::new(self.config.compression_level),
        );
        let mut tar = TarBuilder::new(encoder);
        for path in files {
            cancel.check()?;
            tar.append_path_with_name(path, relative_display(path, base))?;
        }
        let mut buffered = tar.into_inner()?.finish()?;
        buffered.flush()?;
        Ok(buffered.into_inner().map_err(|e| e.into_error())?)
    }
}

/// Every regular file under `dir`, sorted.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Calculates the SHA-256 checksum of a file.
pub fn calculate_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn backup_tree() -> (TempDir, PathBuf) {
        let root = TempDir::new().unwrap();
        let backup_dir = root.path().join("Backup-1403-01-01_23-45");
        fs::create_dir_all(backup_dir.join("search")).unwrap();
        fs::write(backup_dir.join("tree.txt"), "src\n  a.ts\n").unwrap();
        fs::write(backup_dir.join("search/Search_auth.md"), "## a.ts\n").unwrap();
        (root, backup_dir)
    }

    #[test]
    fn test_compression_level_is_clamped() {
        let config = ArchiveConfig::new(ArchiveFormat::Zip).with_compression_level(42);
        assert_eq!(config.compression_level, 9);
    }

    #[test]
    fn test_zip_archive_layout() {
        let (_root, backup_dir) = backup_tree();
        let out = TempDir::new().unwrap();
        let output_dir = out.path().join("zips");

        let result = ArchiveBuilder::new(ArchiveConfig::default())
            .create(&backup_dir, &output_dir, &CancelToken::new())
            .unwrap();

        assert_eq!(
            result.archive_path,
            output_dir.join("Backup-1403-01-01_23-45.zip")
        );
        assert_eq!(result.entry_count, 2);
        assert_eq!(result.checksum.len(), 64);
        assert_eq!(result.checksum, calculate_checksum(&result.archive_path).unwrap());

        let mut zip = zip::ZipArchive::new(File::open(&result.archive_path).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "Backup-1403-01-01_23-45/search/Search_auth.md",
                "Backup-1403-01-01_23-45/tree.txt"
            ]
        );

        let mut content = String::new();
        zip.by_name("Backup-1403-01-01_23-45/tree.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "src\n  a.ts\n");
    }

    #[test]
    fn test_tar_gz_archive_extracts_backup_layout() {
        let (_root, backup_dir) = backup_tree();
        let out = TempDir::new().unwrap();

        let config = ArchiveConfig::new(ArchiveFormat::TarGz).with_compression_level(9);
        let result = ArchiveBuilder::new(config)
            .create(&backup_dir, out.path(), &CancelToken::new())
            .unwrap();
        assert!(result
            .archive_path
            .to_string_lossy()
            .ends_with("Backup-1403-01-01_23-45.tar.gz"));

        let extract_dir = TempDir::new().unwrap();
        let tar = flate2::read::GzDecoder::new(File::open(&result.archive_path).unwrap());
        tar::Archive::new(tar).unpack(extract_dir.path()).unwrap();

        let extracted = extract_dir
            .path()
            .join("Backup-1403-01-01_23-45/search/Search_auth.md");
        assert_eq!(fs::read_to_string(extracted).unwrap(), "## a.ts\n");
    }

    #[test]
    fn test_empty_directory_yields_valid_archive() {
        let root = TempDir::new().unwrap();
        let backup_dir = root.path().join("Backup-empty");
        fs::create_dir(&backup_dir).unwrap();

        let result = ArchiveBuilder::new(ArchiveConfig::new(ArchiveFormat::Zip))
            .create(&backup_dir, root.path(), &CancelToken::new())
            .unwrap();
        assert_eq!(result.entry_count, 0);
        let zip = zip::ZipArchive::new(File::open(&result.archive_path).unwrap()).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn test_cancelled_archive_is_not_created() {
        let (_root, backup_dir) = backup_tree();
        let out = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = ArchiveBuilder::new(ArchiveConfig::default())
            .create(&backup_dir, out.path(), &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    /// Token that trips on its `n`th check.
    fn cancel_on_check(n: usize) -> CancelToken {
        let checks = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        CancelToken::new().with_check(move || {
            checks.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1 >= n
        })
    }

    #[test]
    fn test_archive_cancelled_midway_leaves_nothing_behind() {
        for format in [ArchiveFormat::Zip, ArchiveFormat::TarGz] {
            let (_root, backup_dir) = backup_tree();
            let out = TempDir::new().unwrap();

            // Entry check, first file, then trip before the second file.
            let err = ArchiveBuilder::new(ArchiveConfig::new(format))
                .create(&backup_dir, out.path(), &cancel_on_check(3))
                .unwrap_err();

            assert!(err.is_cancelled());
            assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0, "{:?}", format);
        }
    }

    #[test]
    fn test_archive_replaces_stale_file() {
        let (_root, backup_dir) = backup_tree();
        let out = TempDir::new().unwrap();
        let builder = ArchiveBuilder::new(ArchiveConfig::default());
        fs::write(builder.archive_path(&backup_dir, out.path()), "stale").unwrap();

        let result = builder
            .create(&backup_dir, out.path(), &CancelToken::new())
            .unwrap();
        assert_eq!(result.entry_count, 2);
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 1);
        assert!(zip::ZipArchive::new(File::open(&result.archive_path).unwrap()).is_ok());
    }
}
