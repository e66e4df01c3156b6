//! Configuration types for codestash.json

use super::output::OutputConfig;
use super::step::BackupStep;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Default timezone applied to projects that do not name one.
pub const DEFAULT_TIMEZONE: &str = "Asia/Tehran";

/// Default per-file read ceiling in kilobytes.
pub const DEFAULT_MAX_FILE_KB: u64 = 256;

/// Default archive compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Directories never descended into by default.
pub const DEFAULT_EXCLUDE_FOLDERS: &[&str] = &[
    "node_modules",
    ".next",
    ".turbo",
    "dist",
    "build",
    ".git",
    ".cache",
    "coverage",
    ".output",
    ".nx",
    ".vercel",
    ".expo",
    ".vscode",
    "tmp",
    "__pycache__",
    "venv",
    ".idea",
    "vendor",
    "Pods",
];

/// File names skipped by default.
pub const DEFAULT_EXCLUDE_FILES: &[&str] = &[
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "LICENSE",
    "CHANGELOG",
    ".DS_Store",
    "README.md",
];

/// Substrings that mark test files.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[".spec.", ".test.", ".e2e-spec."];

/// Designated sub-areas of a monorepo-style project.
pub const DEFAULT_AREAS: &[&str] = &["apps/admin", "apps/api", "apps/site", "libs"];

/// Area holding the API sources grouped by `api_group_bundles`.
pub const DEFAULT_API_AREA: &str = "apps/api";

/// Identifies one project. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectConfig {
    pub id: String,
    pub label: String,
    pub project_root: PathBuf,
    pub backup_root: PathBuf,
    pub archive_output_dir: PathBuf,
    pub timezone: Tz,
}

impl ProjectConfig {
    /// Creates a project whose archives land in the backup root.
    pub fn new(id: impl Into<String>, project_root: PathBuf, backup_root: PathBuf) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            project_root,
            archive_output_dir: backup_root.clone(),
            backup_root,
            timezone: chrono_tz::Asia::Tehran,
        }
    }
}

/// Archive container produced after all steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[default]
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz", alias = "tgz", alias = "targz")]
    TarGz,
}

impl ArchiveFormat {
    /// File extension, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => ".zip",
            ArchiveFormat::TarGz => ".tar.gz",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::TarGz => write!(f, "tar.gz"),
        }
    }
}

/// Scanner exclusion rules carried by a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeConfig {
    pub folders: BTreeSet<String>,
    pub files: BTreeSet<String>,
    /// Substrings that exclude a file when present in its name
    pub patterns: Vec<String>,
}

impl Default for ExcludeConfig {
    fn default() -> Self {
        Self {
            folders: DEFAULT_EXCLUDE_FOLDERS.iter().map(|s| s.to_string()).collect(),
            files: DEFAULT_EXCLUDE_FILES.iter().map(|s| s.to_string()).collect(),
            patterns: DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A named execution policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupProfileConfig {
    pub id: String,
    pub label: String,
    pub use_network_time: bool,
    pub skip_archive: bool,
    pub max_file_kb: u64,
    /// Force-disables the project-root helper step
    pub no_root_files: bool,
    pub include_steps: Vec<BackupStep>,
    pub allowed_ts_extensions: Vec<String>,
    pub allowed_full_extensions: Vec<String>,
    pub archive_format: ArchiveFormat,
    pub compression_level: u32,
    pub areas: Vec<String>,
    pub api_area: String,
    pub exclude: ExcludeConfig,
    pub output: OutputConfig,
}

impl BackupProfileConfig {
    /// Creates a profile with every default applied.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            use_network_time: false,
            skip_archive: false,
            max_file_kb: DEFAULT_MAX_FILE_KB,
            no_root_files: false,
            include_steps: BackupStep::defaults(),
            allowed_ts_extensions: default_ts_extensions(),
            allowed_full_extensions: default_full_extensions(),
            archive_format: ArchiveFormat::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            areas: DEFAULT_AREAS.iter().map(|s| s.to_string()).collect(),
            api_area: DEFAULT_API_AREA.to_string(),
            exclude: ExcludeConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Keyword search definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSetConfig {
    pub id: String,
    pub label: String,
    pub keywords: Vec<String>,
    pub extensions: Vec<String>,
}

impl SearchSetConfig {
    /// Creates a search set over the default extensions.
    pub fn new(id: impl Into<String>, keywords: Vec<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            keywords,
            extensions: default_search_extensions(),
        }
    }
}

pub(crate) fn default_ts_extensions() -> Vec<String> {
    vec![".ts".to_string(), ".tsx".to_string()]
}

pub(crate) fn default_full_extensions() -> Vec<String> {
    [
        ".ts", ".tsx", ".js", ".jsx", ".json", ".md", ".yml", ".yaml", ".env", ".sh",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub(crate) fn default_search_extensions() -> Vec<String> {
    [".ts", ".tsx", ".js", ".jsx", ".json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
