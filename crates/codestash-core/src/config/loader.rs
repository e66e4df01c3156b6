//! Configuration file loading and validation

use crate::error::{Error, Result};
use crate::types::config_types::{
    default_full_extensions, default_search_extensions, default_ts_extensions, DEFAULT_API_AREA,
    DEFAULT_AREAS, DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_FILE_KB, DEFAULT_TIMEZONE,
};
use crate::types::{
    ArchiveFormat, BackupProfileConfig, BackupStep, ExcludeConfig, OutputConfig, ProjectConfig,
    SearchSetConfig,
};
use crate::utils::expand_path;
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration file name searched for when no path is given
pub const CONFIG_FILE_NAME: &str = "codestash.json";

/// Loaded and validated codestash configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub projects: Vec<ProjectConfig>,
    pub profiles: Vec<BackupProfileConfig>,
    pub search_sets: Vec<SearchSetConfig>,

    /// Path to the configuration file, when loaded from disk
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawConfigFile {
    projects: Option<Vec<RawProject>>,
    profiles: Option<Vec<RawProfile>>,
    #[serde(default)]
    search_sets: Vec<RawSearchSet>,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    id: Option<String>,
    label: Option<String>,
    project_root: Option<String>,
    backup_root: Option<String>,
    #[serde(alias = "zip_output_dir")]
    archive_output_dir: Option<String>,
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    id: Option<String>,
    label: Option<String>,
    #[serde(default)]
    use_network_time: bool,
    #[serde(default, alias = "skip_zip")]
    skip_archive: bool,
    max_file_kb: Option<i64>,
    #[serde(default)]
    no_root_files: bool,
    include_steps: Option<Vec<String>>,
    allowed_ts_extensions: Option<Vec<String>>,
    allowed_full_extensions: Option<Vec<String>>,
    #[serde(default)]
    archive_format: ArchiveFormat,
    compression_level: Option<u32>,
    areas: Option<Vec<String>>,
    api_area: Option<String>,
    #[serde(default)]
    exclude: ExcludeConfig,
    #[serde(default, alias = "output_config")]
    output: OutputConfig,
}

#[derive(Debug, Deserialize)]
struct RawSearchSet {
    id: Option<String>,
    label: Option<String>,
    keywords: Option<Vec<String>>,
    extensions: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from the specified path or search for it
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, content) = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::config_not_found(p.display().to_string())
                    } else {
                        Error::Io(e)
                    }
                })?;
                (p.to_path_buf(), content)
            }
            None => Self::find_config()?,
        };

        debug!("Loading configuration from {}", config_path.display());

        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = Self::from_json_str(&content, &base_dir)?;
        config.config_path = Some(config_path);
        Ok(config)
    }

    /// Parse and validate a configuration document.
    ///
    /// Relative paths resolve against `base_dir`.
    pub fn from_json_str(content: &str, base_dir: &Path) -> Result<Self> {
        let raw: RawConfigFile = serde_json::from_str(content)?;

        let (Some(raw_projects), Some(raw_profiles)) = (raw.projects, raw.profiles) else {
            return Err(Error::invalid_config(
                "Config must include 'projects' and 'profiles' keys",
            ));
        };

        let mut projects = Vec::with_capacity(raw_projects.len());
        let mut seen = HashSet::new();
        for raw_project in raw_projects {
            let project = validate_project(raw_project, base_dir)?;
            if !seen.insert(project.id.clone()) {
                return Err(Error::duplicate_id("project", project.id));
            }
            projects.push(project);
        }

        let mut profiles = Vec::with_capacity(raw_profiles.len());
        let mut seen = HashSet::new();
        for raw_profile in raw_profiles {
            let profile = validate_profile(raw_profile)?;
            if !seen.insert(profile.id.clone()) {
                return Err(Error::duplicate_id("profile", profile.id));
            }
            profiles.push(profile);
        }

        let mut search_sets = Vec::with_capacity(raw.search_sets.len());
        let mut seen = HashSet::new();
        for raw_search in raw.search_sets {
            let search = validate_search_set(raw_search)?;
            if !seen.insert(search.id.clone()) {
                return Err(Error::duplicate_id("search_set", search.id));
            }
            search_sets.push(search);
        }

        if projects.is_empty() {
            return Err(Error::invalid_config("No projects defined in configuration"));
        }
        if profiles.is_empty() {
            return Err(Error::invalid_config("No profiles defined in configuration"));
        }

        Ok(Self {
            projects,
            profiles,
            search_sets,
            config_path: None,
        })
    }

    /// Find configuration file in the current directory, its parents, or the
    /// user configuration directory
    fn find_config() -> Result<(PathBuf, String)> {
        let cwd = std::env::current_dir().map_err(Error::Io)?;
        let mut current = Some(cwd.as_path());

        while let Some(dir) = current {
            let path = dir.join(CONFIG_FILE_NAME);
            if path.is_file() {
                let content = fs::read_to_string(&path)?;
                return Ok((path, content));
            }
            current = dir.parent();
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("codestash").join(CONFIG_FILE_NAME);
            if path.is_file() {
                let content = fs::read_to_string(&path)?;
                return Ok((path, content));
            }
        }

        Err(Error::config_not_found(format!(
            "{} (searched current and parent directories)",
            CONFIG_FILE_NAME
        )))
    }

    /// Get a project by id
    pub fn project(&self, id: &str) -> Result<&ProjectConfig> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::unknown_project(id))
    }

    /// Get a profile by id
    pub fn profile(&self, id: &str) -> Result<&BackupProfileConfig> {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::unknown_profile(id))
    }

    /// Get a search set by id
    pub fn search_set(&self, id: &str) -> Option<&SearchSetConfig> {
        self.search_sets.iter().find(|s| s.id == id)
    }
}

fn validate_project(raw: RawProject, base_dir: &Path) -> Result<ProjectConfig> {
    let id = raw.id.ok_or_else(|| Error::missing_field("projects[].id"))?;
    let project_root = raw
        .project_root
        .ok_or_else(|| Error::missing_field(format!("projects[{}].project_root", id)))?;
    let backup_root = raw
        .backup_root
        .ok_or_else(|| Error::missing_field(format!("projects[{}].backup_root", id)))?;

    let project_root = expand_path(&project_root, base_dir)?;
    let backup_root = expand_path(&backup_root, base_dir)?;
    let archive_output_dir = match raw.archive_output_dir {
        Some(dir) => expand_path(&dir, base_dir)?,
        None => backup_root.clone(),
    };

    let timezone_name = raw.timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone: Tz = timezone_name
        .parse()
        .map_err(|_| Error::invalid_timezone(&id, &timezone_name))?;

    Ok(ProjectConfig {
        label: raw.label.unwrap_or_else(|| id.clone()),
        id,
        project_root,
        backup_root,
        archive_output_dir,
        timezone,
    })
}

fn validate_profile(raw: RawProfile) -> Result<BackupProfileConfig> {
    let id = raw.id.ok_or_else(|| Error::missing_field("profiles[].id"))?;

    let max_file_kb = raw.max_file_kb.unwrap_or(DEFAULT_MAX_FILE_KB as i64);
    if max_file_kb <= 0 {
        return Err(Error::invalid_config(format!(
            "max_file_kb must be > 0 for profile '{}'",
            id
        )));
    }

    let include_steps = match raw.include_steps {
        Some(names) => names
            .iter()
            .map(|name| name.parse::<BackupStep>())
            .collect::<Result<Vec<_>>>()?,
        None => BackupStep::defaults(),
    };

    let compression_level = raw.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL);
    if compression_level > 9 {
        return Err(Error::invalid_config(format!(
            "compression_level must be 0-9 for profile '{}', got {}",
            id, compression_level
        )));
    }

    Ok(BackupProfileConfig {
        label: raw.label.unwrap_or_else(|| id.clone()),
        id,
        use_network_time: raw.use_network_time,
        skip_archive: raw.skip_archive,
        max_file_kb: max_file_kb as u64,
        no_root_files: raw.no_root_files,
        include_steps,
        allowed_ts_extensions: raw.allowed_ts_extensions.unwrap_or_else(default_ts_extensions),
        allowed_full_extensions: raw
            .allowed_full_extensions
            .unwrap_or_else(default_full_extensions),
        archive_format: raw.archive_format,
        compression_level,
        areas: raw
            .areas
            .unwrap_or_else(|| DEFAULT_AREAS.iter().map(|s| s.to_string()).collect()),
        api_area: raw.api_area.unwrap_or_else(|| DEFAULT_API_AREA.to_string()),
        exclude: raw.exclude,
        output: raw.output,
    })
}

fn validate_search_set(raw: RawSearchSet) -> Result<SearchSetConfig> {
    let (Some(id), Some(keywords)) = (raw.id, raw.keywords) else {
        return Err(Error::missing_field("search_sets[] must include 'id' and 'keywords'"));
    };

    Ok(SearchSetConfig {
        label: raw.label.unwrap_or_else(|| id.clone()),
        id,
        keywords,
        extensions: raw.extensions.unwrap_or_else(default_search_extensions),
    })
}
