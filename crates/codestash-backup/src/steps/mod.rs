//! Bundle writers, one module per step family.
//!
//! Writers differ only in file selection and grouping; rendering goes
//! through [`crate::output`]. Every writer checks the cancel token before
//! each file it processes.

pub mod api_bundles;
pub mod code_bundles;
pub mod configs;
pub mod paths;
pub mod root_files;
pub mod search;
pub mod trees;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::logger::RunLogger;
use crate::naming::NameBuilder;
use crate::output::BundleWriter;
use crate::reader::{read_with_limit, FileText};
use crate::scanning::{relative_display, ScanConfig};
use codestash_core::{BackupProfileConfig, OutputConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Named counters recorded for one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepStats(BTreeMap<String, u64>);

impl StepStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder recorded by dry runs.
    pub fn planned(count: u64) -> Self {
        let mut stats = Self::new();
        stats.set("planned", count);
        stats
    }

    pub fn set(&mut self, key: impl Into<String>, value: u64) {
        self.0.insert(key.into(), value);
    }

    pub fn add(&mut self, key: &str, value: u64) {
        *self.0.entry(key.to_string()).or_insert(0) += value;
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.get(key).copied()
    }

    /// Whether this records a planned rather than executed step.
    pub fn is_planned(&self) -> bool {
        self.0.contains_key("planned")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Statistics and created files of one step.
///
/// Owned by the engine and filled in place, so whatever a step wrote
/// before failing or being cancelled is still accounted for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub stats: StepStats,
    pub files: Vec<PathBuf>,
}

impl StepReport {
    /// Record an output file as soon as it exists on disk.
    pub fn track(&mut self, path: &Path) {
        if !self.files.iter().any(|f| f == path) {
            self.files.push(path.to_path_buf());
        }
    }

    /// Record a completed output file.
    pub fn push_file(&mut self, path: PathBuf) {
        self.stats.add("files_written", 1);
        self.track(&path);
    }
}

/// Read-only view of a run shared by every step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub project_root: &'a Path,
    pub backup_dir: &'a Path,

    /// Output locations never scanned: the backup root holding earlier
    /// runs and the archive directory
    pub output_dirs: &'a [PathBuf],
    pub profile: &'a BackupProfileConfig,
    pub names: &'a NameBuilder,
    pub logger: &'a RunLogger,
    pub cancel: &'a CancelToken,
}

impl<'a> StepContext<'a> {
    pub fn output(&self) -> &'a OutputConfig {
        &self.profile.output
    }

    /// Scan of `root` with the profile's exclusions, never entering the
    /// backup directory or any other output location.
    pub fn scan(&self, root: &Path) -> ScanConfig {
        self.output_dirs.iter().fold(
            ScanConfig::from_exclude(root, &self.profile.exclude).with_skip_path(self.backup_dir),
            |scan, dir| scan.with_skip_path(dir.as_path()),
        )
    }

    /// Read a file under the profile's size ceiling, warning on failure.
    pub fn read(&self, path: &Path) -> FileText {
        read_with_limit(path, self.profile.max_file_kb, |msg| {
            self.logger.warn("WARN", msg)
        })
    }

    /// Write `files` as one bundle at `out`, headers relative to `root`.
    ///
    /// The bundle is tracked in `report` from the moment it is created and
    /// counted in `files_written`/`files_included` once complete. Returns
    /// the number of files included.
    pub fn write_bundle(
        &self,
        report: &mut StepReport,
        files: &[PathBuf],
        root: &Path,
        out: &Path,
        config: &OutputConfig,
    ) -> Result<u64> {
        self.cancel.check()?;
        let title = out
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut writer = BundleWriter::create(out, config, &title)?;
        report.track(out);
        for path in files {
            self.cancel.check()?;
            let content = self.read(path);
            writer.write_entry(&relative_display(path, root), &content)?;
        }
        let included = writer.entries() as u64;
        writer.finish()?;
        report.push_file(out.to_path_buf());
        report.stats.add("files_included", included);
        Ok(included)
    }
}
