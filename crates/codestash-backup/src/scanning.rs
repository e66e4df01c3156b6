//! Project tree scanning.
//!
//! Excluded directories are pruned before descent so dependency trees such
//! as `node_modules` never cost a recursive walk.

use codestash_core::ExcludeConfig;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Rules governing one tree walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub root: PathBuf,

    /// Extensions with leading dot; `None` admits every extension
    pub allowed_extensions: Option<BTreeSet<String>>,

    pub skip_dirs: BTreeSet<String>,
    pub skip_files: BTreeSet<String>,

    /// Substrings that exclude a file when present in its name
    pub skip_if_contains: Vec<String>,

    /// Directories pruned by exact path, such as the run's own output
    pub skip_paths: Vec<PathBuf>,
}

impl ScanConfig {
    /// Scan of `root` with the default exclusions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_exclude(root, &ExcludeConfig::default())
    }

    /// Scan of `root` with a profile's exclusions.
    pub fn from_exclude(root: impl Into<PathBuf>, exclude: &ExcludeConfig) -> Self {
        Self {
            root: root.into(),
            allowed_extensions: None,
            skip_dirs: exclude.folders.clone(),
            skip_files: exclude.files.clone(),
            skip_if_contains: exclude.patterns.clone(),
            skip_paths: Vec::new(),
        }
    }

    /// Restrict the walk to the given extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Never descend into `path`.
    pub fn with_skip_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.skip_paths.push(path.into());
        self
    }

    fn prune(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        !self.skip_dirs.contains(entry.file_name().to_string_lossy().as_ref())
            && !self.skip_paths.iter().any(|p| p == entry.path())
    }

    fn admits(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };
        if self.skip_files.contains(name.as_ref()) {
            return false;
        }
        if self
            .skip_if_contains
            .iter()
            .any(|pattern| name.contains(pattern.as_str()))
        {
            return false;
        }
        match &self.allowed_extensions {
            Some(allowed) => allowed.contains(&extension_of(path)),
            None => true,
        }
    }
}

/// Extension of `path` including the leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Lazily walk the tree, yielding admitted file paths in no particular order.
///
/// Each call starts a fresh walk. Unreadable directories are skipped.
pub fn walk(config: &ScanConfig) -> impl Iterator<Item = PathBuf> + '_ {
    WalkDir::new(&config.root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| config.prune(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
        })
        .map(DirEntry::into_path)
        .filter(move |path| config.admits(path))
}

/// Walk the tree and sort the result lexicographically.
pub fn collect_sorted(config: &ScanConfig) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = walk(config).collect();
    paths.sort();
    paths
}

/// Designated sub-areas that exist under `project_root`, in configured order.
pub fn project_areas<'a>(project_root: &Path, areas: &'a [String]) -> Vec<(&'a str, PathBuf)> {
    areas
        .iter()
        .map(|area| (area.as_str(), project_root.join(area)))
        .filter(|(_, path)| path.is_dir())
        .collect()
}

/// Short name of an area: its last path component (`apps/admin` -> `admin`).
pub fn area_name(area: &str) -> &str {
    area.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(area)
}

/// Path of `path` relative to `root`, with `/` separators.
pub fn relative_display(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn names(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| relative_display(p, root)).collect()
    }

    #[test]
    fn test_ts_scan_excludes_tests_and_dependencies() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.ts");
        touch(dir.path(), "b.test.ts");
        touch(dir.path(), "node_modules/c.ts");

        let config = ScanConfig {
            root: dir.path().to_path_buf(),
            allowed_extensions: Some([".ts".to_string()].into()),
            skip_dirs: ["node_modules".to_string()].into(),
            skip_files: BTreeSet::new(),
            skip_if_contains: vec![".test.".to_string()],
            skip_paths: Vec::new(),
        };

        let found = collect_sorted(&config);
        assert_eq!(names(dir.path(), &found), vec!["a.ts"]);
    }

    #[test]
    fn test_default_exclusions() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/index.ts");
        touch(dir.path(), "src/app.spec.ts");
        touch(dir.path(), "dist/index.js");
        touch(dir.path(), ".git/HEAD");
        touch(dir.path(), "package-lock.json");
        touch(dir.path(), "package.json");

        let found = collect_sorted(&ScanConfig::new(dir.path()));
        assert_eq!(
            names(dir.path(), &found),
            vec!["package.json", "src/index.ts"]
        );
    }

    #[test]
    fn test_root_named_like_excluded_dir_is_still_walked() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "build/main.ts");

        let config = ScanConfig::new(dir.path().join("build"));
        assert_eq!(walk(&config).count(), 1);
    }

    #[test]
    fn test_skip_path_prunes_output_directory() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/a.ts");
        touch(dir.path(), "backups/Backup-1/all_code.txt");

        let config = ScanConfig::new(dir.path()).with_skip_path(dir.path().join("backups/Backup-1"));
        assert_eq!(names(dir.path(), &collect_sorted(&config)), vec!["src/a.ts"]);
    }

    #[test]
    fn test_extension_filter() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.ts");
        touch(dir.path(), "b.tsx");
        touch(dir.path(), "c.js");
        touch(dir.path(), "Dockerfile");

        let config = ScanConfig::new(dir.path()).with_extensions([".ts", ".tsx"]);
        assert_eq!(names(dir.path(), &collect_sorted(&config)), vec!["a.ts", "b.tsx"]);
    }

    #[test]
    fn test_walk_is_restartable() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "one.ts");
        touch(dir.path(), "two/three.ts");

        let config = ScanConfig::new(dir.path());
        assert_eq!(walk(&config).count(), 2);
        assert_eq!(walk(&config).count(), 2);
    }

    #[test]
    fn test_project_areas_and_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("apps/api")).unwrap();
        fs::create_dir_all(dir.path().join("libs")).unwrap();

        let areas: Vec<String> = ["apps/admin", "apps/api", "libs"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let found = project_areas(dir.path(), &areas);
        let found: Vec<&str> = found.iter().map(|(a, _)| *a).collect();
        assert_eq!(found, vec!["apps/api", "libs"]);

        assert_eq!(area_name("apps/admin"), "admin");
        assert_eq!(area_name("libs"), "libs");
        assert_eq!(area_name("apps/site/"), "site");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/b.tsx")), ".tsx");
        assert_eq!(extension_of(Path::new("Dockerfile")), "");
        assert_eq!(extension_of(Path::new(".env")), "");
    }
}
