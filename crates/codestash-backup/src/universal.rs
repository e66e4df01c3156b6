//! Standalone bundling of an arbitrary source tree.
//!
//! Unlike the profile-driven steps, a universal bundle is configured
//! directly: extension lists and named presets, folder/file/regex
//! exclusions, hidden-file exclusion and an optional split into one output
//! per top-level folder.

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::logger::{LogCallback, ProgressCallback, RunLogger};
use crate::output::BundleWriter;
use crate::reader::read_with_limit;
use crate::scanning::relative_display;
use codestash_core::types::DEFAULT_MAX_FILE_KB;
use codestash_core::{OutputConfig, OutputFormat};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Named extension groups selectable alongside explicit extensions.
pub const EXTENSION_PRESETS: &[(&str, &[&str])] = &[
    ("typescript", &[".ts", ".tsx"]),
    ("javascript", &[".js", ".jsx"]),
    ("web_all", &[".ts", ".tsx", ".js", ".jsx", ".vue", ".svelte"]),
    ("styles", &[".css", ".scss", ".sass", ".less", ".styl"]),
    ("config", &[".json", ".yaml", ".yml", ".toml", ".ini", ".env"]),
    ("python", &[".py", ".pyi", ".pyx"]),
    ("documentation", &[".md", ".mdx", ".rst", ".txt"]),
    ("html", &[".html", ".htm", ".ejs", ".hbs"]),
    (
        "all_code",
        &[
            ".ts", ".tsx", ".js", ".jsx", ".py", ".vue", ".svelte", ".go", ".rs", ".java", ".kt",
        ],
    ),
];

/// Folders excluded from universal bundles unless overridden.
pub const COMMON_EXCLUDE_FOLDERS: &[&str] = &[
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
    ".mypy_cache",
    ".pytest_cache",
    "htmlcov",
    ".tox",
    "egg-info",
    ".eggs",
    "target",
    "out",
    ".gradle",
    ".mvn",
];

/// Lock files and repository metadata.
pub const COMMON_EXCLUDE_FILES: &[&str] = &[
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "LICENSE",
    "CHANGELOG",
    ".DS_Store",
    ".gitignore",
    ".npmrc",
    "Thumbs.db",
];

/// Hidden names still admitted when hidden files are excluded.
const HIDDEN_ALLOWLIST: &[&str] = &[".env"];

/// Group name for files directly under the source root when splitting.
pub const ROOT_GROUP: &str = "_root";

/// Extensions of a named preset.
pub fn preset_extensions(name: &str) -> Option<&'static [&'static str]> {
    EXTENSION_PRESETS
        .iter()
        .find(|(preset, _)| *preset == name)
        .map(|(_, exts)| *exts)
}

/// Configuration of one universal bundling run.
#[derive(Debug, Clone)]
pub struct UniversalBackupConfig {
    pub source_root: PathBuf,
    pub output_dir: PathBuf,

    /// Output file stem; split outputs append `_<folder>`
    pub output_filename: String,

    pub extensions: Vec<String>,
    pub extension_presets: Vec<String>,

    pub exclude_folders: BTreeSet<String>,
    pub exclude_files: BTreeSet<String>,

    /// Regular expressions matched against the root-relative path
    pub exclude_patterns: Vec<String>,

    pub exclude_hidden: bool,
    pub output: OutputConfig,
    pub max_file_kb: u64,
    pub split_by_folder: bool,
}

impl UniversalBackupConfig {
    pub fn new(source_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_dir: output_dir.into(),
            output_filename: "backup".to_string(),
            extensions: [".ts", ".tsx", ".js", ".jsx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extension_presets: Vec::new(),
            exclude_folders: COMMON_EXCLUDE_FOLDERS.iter().map(|s| s.to_string()).collect(),
            exclude_files: COMMON_EXCLUDE_FILES.iter().map(|s| s.to_string()).collect(),
            exclude_patterns: Vec::new(),
            exclude_hidden: true,
            output: OutputConfig {
                dynamic_names: false,
                ..OutputConfig::default()
            },
            max_file_kb: DEFAULT_MAX_FILE_KB,
            split_by_folder: false,
        }
    }

    pub fn with_output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = name.into();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_presets<I, S>(mut self, presets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extension_presets = presets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    pub fn with_max_file_kb(mut self, max_file_kb: u64) -> Self {
        self.max_file_kb = max_file_kb;
        self
    }

    pub fn with_split_by_folder(mut self, split: bool) -> Self {
        self.split_by_folder = split;
        self
    }

    pub fn with_exclude_hidden(mut self, exclude_hidden: bool) -> Self {
        self.exclude_hidden = exclude_hidden;
        self
    }

    /// Explicit extensions plus every known preset, lowercased. Unknown
    /// presets contribute nothing.
    pub fn all_extensions(&self) -> BTreeSet<String> {
        let presets = self
            .extension_presets
            .iter()
            .filter_map(|name| preset_extensions(name))
            .flat_map(|exts| exts.iter().map(|s| s.to_string()));
        self.extensions
            .iter()
            .cloned()
            .chain(presets)
            .map(|ext| ext.to_lowercase())
            .collect()
    }

    fn is_hidden(&self, name: &str) -> bool {
        self.exclude_hidden && name.starts_with('.') && !HIDDEN_ALLOWLIST.contains(&name)
    }
}

/// One matched file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupFileInfo {
    pub path: PathBuf,

    /// Path relative to the source root, `/`-separated
    pub relative_path: String,

    pub size_bytes: u64,

    /// Known once the file has been read
    pub line_count: Option<usize>,
}

impl BackupFileInfo {
    /// Top-level folder of the file, or [`ROOT_GROUP`] for root files.
    pub fn top_folder(&self) -> &str {
        match self.relative_path.split_once('/') {
            Some((top, _)) => top,
            None => ROOT_GROUP,
        }
    }
}

/// Aggregated statistics of a universal run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UniversalBackupStats {
    pub total_files: u64,
    pub total_size_bytes: u64,
    pub files_included: u64,
    pub files_excluded: u64,
    pub files_truncated: u64,
    pub output_files_created: u64,
    pub output_paths: Vec<PathBuf>,
}

/// Compiled exclusion patterns; invalid expressions are skipped.
fn compile_patterns(patterns: &[String], logger: &RunLogger) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                logger.warn("WARN", &format!("Ignoring invalid pattern '{}': {}", pattern, e));
                None
            }
        })
        .collect()
}

/// Lowercased extension with its dot; dotfiles such as `.env` count as
/// their own extension.
fn extension_key(path: &Path, name: &str) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
        None if name.starts_with('.') => name.to_lowercase(),
        None => String::new(),
    }
}

fn keep_dir(config: &UniversalBackupConfig, entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !config.exclude_folders.contains(name.as_ref()) && !config.is_hidden(&name)
}

/// Files selected by `config`, sorted by relative path. The second value
/// counts candidate files rejected by the exclusion rules.
pub fn collect_backup_files(
    config: &UniversalBackupConfig,
    cancel: &CancelToken,
) -> Result<(Vec<BackupFileInfo>, u64)> {
    collect_with_logger(config, cancel, &RunLogger::silent())
}

fn collect_with_logger(
    config: &UniversalBackupConfig,
    cancel: &CancelToken,
    logger: &RunLogger,
) -> Result<(Vec<BackupFileInfo>, u64)> {
    let extensions = config.all_extensions();
    let patterns = compile_patterns(&config.exclude_patterns, logger);
    let mut files = Vec::new();
    let mut excluded = 0;

    let walker = WalkDir::new(&config.source_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| keep_dir(config, entry));
    for entry in walker {
        cancel.check()?;
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        if !extensions.is_empty() && !extensions.contains(&extension_key(path, &name)) {
            continue;
        }

        let relative_path = relative_display(path, &config.source_root);
        if config.is_hidden(&name)
            || config.exclude_files.contains(name.as_ref())
            || patterns.iter().any(|re| re.is_match(&relative_path))
        {
            excluded += 1;
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        files.push(BackupFileInfo {
            path: path.to_path_buf(),
            relative_path,
            size_bytes: metadata.len(),
            line_count: None,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok((files, excluded))
}

/// Write `files` into one output, updating `stats` and each file's line count.
#[allow(clippy::too_many_arguments)]
fn write_output(
    out: &Path,
    title: &str,
    files: &mut [BackupFileInfo],
    config: &UniversalBackupConfig,
    stats: &mut UniversalBackupStats,
    cancel: &CancelToken,
    logger: &RunLogger,
    progress: Option<&ProgressCallback>,
    total: usize,
) -> Result<()> {
    let mut writer = BundleWriter::create(out, &config.output, title)?;
    for info in files.iter_mut() {
        cancel.check()?;
        let content = read_with_limit(&info.path, config.max_file_kb, |msg| {
            logger.warn("WARN", msg)
        });
        info.line_count = Some(content.line_count());
        writer.write_entry(&info.relative_path, &content)?;

        stats.files_included += 1;
        if content.truncated {
            stats.files_truncated += 1;
        }
        if let Some(progress) = progress {
            progress(stats.files_included as usize, total, &info.relative_path);
        }
    }
    let path = writer.finish()?;
    stats.output_files_created += 1;
    stats.output_paths.push(path);
    Ok(())
}

/// Bundle `config.source_root` into `config.output_dir`.
///
/// Produces `<output_filename><ext>`, or `<output_filename>_<folder><ext>` per
/// top-level folder when splitting. Nothing is written when no file matches.
pub fn run_universal_backup(
    config: &UniversalBackupConfig,
    cancel: &CancelToken,
    log: Option<LogCallback>,
    progress: Option<ProgressCallback>,
) -> Result<UniversalBackupStats> {
    let logger = RunLogger::for_bundle(&config.source_root.display().to_string(), log);
    let mut stats = UniversalBackupStats::default();

    logger.info(
        "BUNDLE",
        &format!("Starting backup from: {}", config.source_root.display()),
    );
    let extensions: Vec<String> = config.all_extensions().into_iter().collect();
    logger.debug("BUNDLE", &format!("Extensions: {}", extensions.join(", ")));

    let (mut files, excluded) = collect_with_logger(config, cancel, &logger)?;
    stats.total_files = files.len() as u64;
    stats.total_size_bytes = files.iter().map(|f| f.size_bytes).sum();
    stats.files_excluded = excluded;
    logger.info("BUNDLE", &format!("Found {} files to backup", files.len()));

    if files.is_empty() {
        logger.info("BUNDLE", "No files found matching criteria");
        return Ok(stats);
    }
    fs::create_dir_all(&config.output_dir)?;

    let ext = config.output.format.extension();
    let root_name = config
        .source_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.source_root.display().to_string());
    let title = format!("Backup: {}", root_name);
    let total = files.len();

    if config.split_by_folder {
        let mut groups: BTreeMap<String, Vec<BackupFileInfo>> = BTreeMap::new();
        for info in files {
            groups
                .entry(info.top_folder().to_string())
                .or_default()
                .push(info);
        }
        for (folder, group) in groups.iter_mut() {
            cancel.check()?;
            let out = config
                .output_dir
                .join(format!("{}_{}{}", config.output_filename, folder, ext));
            write_output(&out, &title, group, config, &mut stats, cancel, &logger, None, total)?;
            if let Some(progress) = &progress {
                progress(stats.files_included as usize, total, &format!("Backed up {}", folder));
            }
        }
    } else {
        let out = config
            .output_dir
            .join(format!("{}{}", config.output_filename, ext));
        write_output(
            &out,
            &title,
            &mut files,
            config,
            &mut stats,
            cancel,
            &logger,
            progress.as_ref(),
            total,
        )?;
    }

    logger.info(
        "BUNDLE",
        &format!(
            "Backup complete: {} files written to {} output file(s)",
            stats.files_included, stats.output_files_created
        ),
    );
    Ok(stats)
}

/// Output format parsed from a CLI-style name.
pub fn parse_format(value: &str) -> Option<OutputFormat> {
    match value.to_ascii_lowercase().as_str() {
        "txt" | "text" => Some(OutputFormat::Txt),
        "md" | "markdown" => Some(OutputFormat::Md),
        "html" => Some(OutputFormat::Html),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn source(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn names(files: &[BackupFileInfo]) -> Vec<&str> {
        files.iter().map(|f| f.relative_path.as_str()).collect()
    }

    #[test]
    fn test_presets_extend_explicit_extensions() {
        let config = UniversalBackupConfig::new("/src", "/out")
            .with_extensions([".TS"])
            .with_presets(["styles", "nonexistent"]);
        let exts = config.all_extensions();
        assert!(exts.contains(".ts"));
        assert!(exts.contains(".scss"));
        assert!(!exts.contains(".tsx"));
        assert_eq!(preset_extensions("python"), Some(&[".py", ".pyi", ".pyx"][..]));
    }

    #[test]
    fn test_selection_rules() {
        let src = source(&[
            ("src/App.TSX", "app"),
            ("src/util.ts", "util"),
            ("src/generated/api.ts", "gen"),
            (".hidden/x.ts", "hidden"),
            ("src/.secret.ts", "secret"),
            ("node_modules/lib/index.js", "lib"),
            ("target/out.js", "out"),
            ("notes.md", "notes"),
        ]);
        let config = UniversalBackupConfig::new(src.path(), "/unused")
            .with_exclude_patterns(["generated/", "(unclosed"]);
        let (files, excluded) = collect_backup_files(&config, &CancelToken::new()).unwrap();

        assert_eq!(names(&files), vec!["src/App.TSX", "src/util.ts"]);
        // generated/api.ts and .secret.ts
        assert_eq!(excluded, 2);
    }

    #[test]
    fn test_env_survives_hidden_exclusion() {
        let src = source(&[(".env", "KEY=1"), (".envrc", "x")]);
        let config = UniversalBackupConfig::new(src.path(), "/unused").with_presets(["config"]);
        let (files, _) = collect_backup_files(&config, &CancelToken::new()).unwrap();
        assert_eq!(names(&files), vec![".env"]);
    }

    #[test]
    fn test_single_output() {
        let src = source(&[("a.ts", "const a = 1;\n"), ("lib/b.js", "let b;\n")]);
        let out = TempDir::new().unwrap();
        let config = UniversalBackupConfig::new(src.path(), out.path()).with_output_filename("snap");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressCallback = Arc::new(move |cur: usize, total: usize, label: &str| {
            sink.lock().unwrap().push((cur, total, label.to_string()))
        });
        let stats = run_universal_backup(&config, &CancelToken::new(), None, Some(progress)).unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.files_included, 2);
        assert_eq!(stats.output_files_created, 1);
        assert_eq!(stats.output_paths, vec![out.path().join("snap.txt")]);
        assert_eq!(stats.total_size_bytes, 13 + 7);

        let content = fs::read_to_string(out.path().join("snap.txt")).unwrap();
        assert!(content.contains("===== a.ts =====\n[Size: 0.0KB | Lines: 1]\nconst a = 1;\n"));
        assert!(content.contains("===== lib/b.js ====="));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last().unwrap(), &(2, 2, "lib/b.js".to_string()));
    }

    #[test]
    fn test_split_by_folder() {
        let src = source(&[("index.ts", "i"), ("api/a.ts", "a"), ("web/w.ts", "w")]);
        let out = TempDir::new().unwrap();
        let config = UniversalBackupConfig::new(src.path(), out.path())
            .with_split_by_folder(true)
            .with_output(OutputConfig {
                format: OutputFormat::Md,
                ..OutputConfig::default()
            });
        let stats = run_universal_backup(&config, &CancelToken::new(), None, None).unwrap();

        assert_eq!(stats.output_files_created, 3);
        assert!(out.path().join("backup__root.md").exists());
        assert!(out.path().join("backup_api.md").exists());
        assert!(out.path().join("backup_web.md").exists());
        let api = fs::read_to_string(out.path().join("backup_api.md")).unwrap();
        assert!(api.contains("## api/a.ts\n"));
    }

    #[test]
    fn test_truncation_and_html() {
        let big = "x".repeat(2048);
        let src = source(&[("big.ts", big.as_str())]);
        let out = TempDir::new().unwrap();
        let config = UniversalBackupConfig::new(src.path(), out.path())
            .with_max_file_kb(1)
            .with_output(OutputConfig {
                format: OutputFormat::Html,
                ..OutputConfig::default()
            });
        let stats = run_universal_backup(&config, &CancelToken::new(), None, None).unwrap();

        assert_eq!(stats.files_truncated, 1);
        let html = fs::read_to_string(out.path().join("backup.html")).unwrap();
        assert!(html.contains("<title>Backup: "));
        assert!(html.contains("TRUNCATED DUE TO SIZE"));
    }

    #[test]
    fn test_no_matches_writes_nothing() {
        let src = source(&[("readme.txt", "x")]);
        let out = TempDir::new().unwrap();
        let output_dir = out.path().join("bundles");
        let config = UniversalBackupConfig::new(src.path(), &output_dir);
        let stats = run_universal_backup(&config, &CancelToken::new(), None, None).unwrap();
        assert_eq!(stats.output_files_created, 0);
        assert!(!output_dir.exists());
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("MD"), Some(OutputFormat::Md));
        assert_eq!(parse_format("html"), Some(OutputFormat::Html));
        assert_eq!(parse_format("pdf"), None);
    }
}
