//! Artifact and backup-directory naming.

use chrono::{DateTime, TimeZone};
use codestash_core::utils::slugify;
use codestash_core::{OutputConfig, OutputFormat, ProjectConfig};
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Slug used when no project identifier yields one.
pub const FALLBACK_PROJECT_SLUG: &str = "project";

/// Placeholder id of projects created on the fly.
const DYNAMIC_ID: &str = "dynamic";

/// Attempts made to find a free backup-directory name.
const MAX_DIR_ATTEMPTS: usize = 1000;

/// Expand `{project}`, `{base}` and `{stamp}` in `template`.
///
/// `{{` and `}}` are literal braces. Returns `None` for unknown placeholders
/// or unbalanced braces.
pub fn expand_template(template: &str, project: &str, base: &str, stamp: &str) -> Option<String> {
    let mut out = String::with_capacity(template.len() + project.len() + base.len() + stamp.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        ch => key.push(ch),
                    }
                }
                match key.as_str() {
                    "project" => out.push_str(project),
                    "base" => out.push_str(base),
                    "stamp" => out.push_str(stamp),
                    _ => return None,
                }
            }
            '}' => return None,
            ch => out.push(ch),
        }
    }

    Some(out)
}

/// Artifact file name stem: the expanded template, or the fixed
/// `{project}_{base}_{stamp}` concatenation when expansion fails.
pub fn render_name(template: &str, project: &str, base: &str, stamp: &str) -> String {
    expand_template(template, project, base, stamp)
        .unwrap_or_else(|| format!("{}_{}_{}", project, base, stamp))
}

/// Slug of the first usable identifier among the project id, label and root
/// folder name.
pub fn project_slug(project: &ProjectConfig) -> String {
    let mut candidates: Vec<&str> = Vec::new();
    if !project.id.is_empty() && !project.id.eq_ignore_ascii_case(DYNAMIC_ID) {
        candidates.push(&project.id);
    }
    if !project.label.is_empty() {
        candidates.push(&project.label);
    }
    let root_name = project
        .project_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    if let Some(name) = root_name.as_deref() {
        candidates.push(name);
    }

    candidates
        .into_iter()
        .map(slugify)
        .find(|slug| !slug.is_empty() && slug != DYNAMIC_ID)
        .unwrap_or_else(|| FALLBACK_PROJECT_SLUG.to_string())
}

/// Compact Gregorian stamp for artifact names: `YYYYMMDD_HHMM`.
pub fn file_stamp<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    dt.format("%Y%m%d_%H%M").to_string()
}

/// Backup directory name for a Jalali stamp.
pub fn backup_dir_name(jalali_stamp: &str) -> String {
    format!("Backup-{}", jalali_stamp)
}

/// Create `root/name`, appending `-2`, `-3`, ... while the name is taken.
///
/// Creation is atomic, so concurrent runs never share a directory.
pub fn create_unique_dir(root: &Path, name: &str) -> io::Result<PathBuf> {
    for attempt in 1..=MAX_DIR_ATTEMPTS {
        let candidate = if attempt == 1 {
            root.join(name)
        } else {
            root.join(format!("{}-{}", name, attempt))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free backup directory name for {} under {}", name, root.display()),
    ))
}

/// Generates artifact paths inside one backup directory.
///
/// Bound once per run; every step receives the same instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameBuilder {
    backup_dir: PathBuf,
    project_slug: String,
    stamp: String,
    format: OutputFormat,
    dynamic_names: bool,
    template: String,
}

impl NameBuilder {
    pub fn new(
        backup_dir: impl Into<PathBuf>,
        project_slug: impl Into<String>,
        stamp: impl Into<String>,
        output: &OutputConfig,
    ) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            project_slug: project_slug.into(),
            stamp: stamp.into(),
            format: output.format,
            dynamic_names: output.dynamic_names,
            template: output.name_template.clone(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// File name for `base` with an explicit extension.
    pub fn file_name(&self, base: &str, ext: &str) -> String {
        let base = slugify(base);
        let stem = if self.dynamic_names {
            render_name(&self.template, &self.project_slug, &base, &self.stamp)
        } else {
            base
        };
        format!("{}{}", stem, ext)
    }

    /// Path for `base` in the run's output format.
    pub fn path(&self, base: &str) -> PathBuf {
        self.path_with_ext(base, self.format.extension())
    }

    /// Path for `base` with an explicit extension.
    pub fn path_with_ext(&self, base: &str, ext: &str) -> PathBuf {
        self.backup_dir.join(self.file_name(base, ext))
    }
}
