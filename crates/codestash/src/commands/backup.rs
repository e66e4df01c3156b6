//! Backup command

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use clap::Args;
use codestash_backup::{
    BackupEngine, BackupFailure, BackupResult, PhaseProgress, RunOptions, RunStatus,
    ARCHIVE_STATS_KEY,
};
use codestash_core::{AppConfig, BackupProfileConfig, ProjectConfig};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::commands::load_config;
use crate::output;

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Project id from the configuration
    #[arg(short, long)]
    pub project: String,

    /// Backup profile id (defaults to the first configured profile)
    #[arg(short = 'P', long)]
    pub profile: Option<String>,

    /// Show what would be written without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Free-form note stored with the backup
    #[arg(short, long)]
    pub note: Option<String>,

    /// Resolve time from network sources before falling back to the system clock
    #[arg(long, conflicts_with = "no_network_time")]
    pub network_time: bool,

    /// Use the system clock even if the profile enables network time
    #[arg(long)]
    pub no_network_time: bool,

    /// Do not create an archive
    #[arg(long)]
    pub skip_archive: bool,

    /// Also write Tree.md and AllCode_Backup.md
    #[arg(long, conflicts_with = "no_root_files")]
    pub root_files: bool,

    /// Never write Tree.md and AllCode_Backup.md
    #[arg(long)]
    pub no_root_files: bool,

    /// Steps to run instead of the profile's (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub steps: Vec<String>,

    /// Search sets to run (comma-separated; default: all)
    #[arg(long, value_delimiter = ',')]
    pub search: Vec<String>,

    /// Archive compression level (0-9)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub compression: Option<u32>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl BackupArgs {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            note: self.note.clone(),
            use_network_time: match (self.network_time, self.no_network_time) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            },
            skip_archive: self.skip_archive.then_some(true),
            include_project_root_files: match (self.root_files, self.no_root_files) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            },
            include_steps: (!self.steps.is_empty()).then(|| self.steps.clone()),
            search_set_ids: (!self.search.is_empty()).then(|| self.search.clone()),
            compression_level: self.compression,
        }
    }
}

pub async fn run(args: BackupArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let (project, profile) = select(&config, &args)?;

    if !args.json {
        output::header("Backup Project");
        output::kv("Project", &format!("{} ({})", project.label, project.id));
        output::kv("Profile", &format!("{} ({})", profile.label, profile.id));
        output::kv("Source", &project.project_root.display().to_string());
        output::kv("Destination", &project.backup_root.display().to_string());
        if args.dry_run {
            output::warning("DRY RUN MODE - nothing will be written");
        }
        println!();
    }

    if !args.dry_run && !args.yes && !args.json {
        use dialoguer::Confirm;
        if !Confirm::new()
            .with_prompt("Proceed with backup?")
            .default(true)
            .interact()?
        {
            output::info("Backup cancelled");
            return Ok(());
        }
    }

    let progress = PhaseProgress::new(args.json);
    let engine = BackupEngine::new(project.clone(), profile.clone())
        .with_search_sets(config.search_sets.clone())
        .with_progress_callback(progress.callback());

    let token = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    match engine.run(args.run_options()).await {
        Ok(result) => {
            progress.finish("Done");
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }
            Ok(())
        }
        Err(failure) => {
            progress.finish_and_clear();
            report_failure(&failure, args.json)?;
            Err(anyhow!(failure.error))
        }
    }
}

/// Resolve the project and profile named on the command line.
fn select(config: &AppConfig, args: &BackupArgs) -> Result<(ProjectConfig, BackupProfileConfig)> {
    let project = config.project(&args.project)?.clone();
    let profile = match &args.profile {
        Some(id) => config.profile(id)?.clone(),
        None => config
            .profiles
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("No profiles defined in configuration"))?,
    };
    Ok((project, profile))
}

#[derive(Tabled)]
struct StepRow {
    step: String,
    stats: String,
}

fn step_rows(result: &BackupResult) -> Vec<StepRow> {
    result
        .stats
        .iter()
        .map(|(step, stats)| StepRow {
            step: step.clone(),
            stats: stats
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}

fn print_summary(result: &BackupResult) {
    println!();
    if result.is_dry_run {
        output::success("Dry run complete");
    } else {
        output::success("Backup created successfully");
    }
    println!();

    if let Some(dir) = &result.backup_root_path {
        output::kv("Backup directory", &dir.display().to_string());
    }
    output::kv("Files written", &result.created_files.len().to_string());
    if let Some(archive) = &result.archive_path {
        output::kv("Archive", &archive.display().to_string());
    }
    if let Some(checksum) = &result.archive_checksum {
        output::kv("SHA-256", checksum);
    }
    if let Some(size) = result.stats.get(ARCHIVE_STATS_KEY).and_then(|s| s.get("size_bytes")) {
        output::kv("Archive size", &output::format_bytes(size));
    }
    if let Some(source) = &result.time_source {
        output::kv("Time source", source);
    }
    output::kv("Duration", &format!("{:.1}s", result.duration_seconds));

    let rows = step_rows(result);
    if !rows.is_empty() {
        println!();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }
}

fn report_failure(failure: &BackupFailure, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&failure.partial)?);
        return Ok(());
    }

    let partial = &failure.partial;
    match partial.status {
        RunStatus::Cancelled => output::warning("Backup cancelled"),
        _ => output::error(&format!("Backup failed: {}", failure.error)),
    }
    if let Some(dir) = &partial.backup_root_path {
        output::kv("Partial output", &dir.display().to_string());
    }
    if !partial.created_files.is_empty() {
        output::kv("Files written", &partial.created_files.len().to_string());
    }
    Ok(())
}
