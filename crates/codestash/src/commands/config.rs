//! Config command

use anyhow::Result;
use camino::Utf8Path;
use codestash_core::AppConfig;
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::{ConfigCommands, ConfigShowArgs};
use crate::commands::load_config;
use crate::output;

pub fn run(cmd: ConfigCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Validate => validate(config_path),
        ConfigCommands::Show(args) => show(args, config_path),
    }
}

fn validate(config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let source = config
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    output::success(&format!("Configuration is valid: {}", source));
    output::kv("Projects", &config.projects.len().to_string());
    output::kv("Profiles", &config.profiles.len().to_string());
    output::kv("Search sets", &config.search_sets.len().to_string());

    for project in &config.projects {
        if !project.project_root.is_dir() {
            output::warning(&format!(
                "Project '{}' root does not exist yet: {}",
                project.id,
                project.project_root.display()
            ));
        }
    }
    Ok(())
}

#[derive(Tabled)]
struct ProjectRow {
    id: String,
    label: String,
    root: String,
    backups: String,
    timezone: String,
}

#[derive(Tabled)]
struct ProfileRow {
    id: String,
    steps: String,
    format: String,
    archive: String,
    #[tabled(rename = "max kb")]
    max_kb: u64,
}

#[derive(Tabled)]
struct SearchSetRow {
    id: String,
    keywords: String,
    extensions: String,
}

fn show(args: ConfigShowArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&config))?);
        return Ok(());
    }

    output::header("Projects");
    let mut table = Table::new(project_rows(&config));
    table.with(Style::sharp());
    println!("{}", table);

    output::header("Profiles");
    let mut table = Table::new(profile_rows(&config));
    table.with(Style::sharp());
    println!("{}", table);

    if !config.search_sets.is_empty() {
        output::header("Search sets");
        let rows: Vec<SearchSetRow> = config
            .search_sets
            .iter()
            .map(|s| SearchSetRow {
                id: s.id.clone(),
                keywords: s.keywords.join(", "),
                extensions: s.extensions.join(" "),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }
    Ok(())
}

fn project_rows(config: &AppConfig) -> Vec<ProjectRow> {
    config
        .projects
        .iter()
        .map(|p| ProjectRow {
            id: p.id.clone(),
            label: p.label.clone(),
            root: p.project_root.display().to_string(),
            backups: p.backup_root.display().to_string(),
            timezone: p.timezone.name().to_string(),
        })
        .collect()
}

fn profile_rows(config: &AppConfig) -> Vec<ProfileRow> {
    config
        .profiles
        .iter()
        .map(|p| ProfileRow {
            id: p.id.clone(),
            steps: p
                .include_steps
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            format: p.output.format.to_string(),
            archive: if p.skip_archive {
                "skipped".to_string()
            } else {
                format!("{} (level {})", p.archive_format, p.compression_level)
            },
            max_kb: p.max_file_kb,
        })
        .collect()
}

fn to_json(config: &AppConfig) -> serde_json::Value {
    json!({
        "config_path": config.config_path,
        "projects": config.projects,
        "profiles": config.profiles,
        "search_sets": config.search_sets,
    })
}
