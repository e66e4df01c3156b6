//! The backup orchestration engine.
//!
//! A run moves through `Pre-checks`, one phase per enabled step in declared
//! order, `Archive` unless skipped, and `Summary`. Dry runs walk the same
//! phases and report the same progress, but only log intent and record
//! `planned` statistics.

use crate::archive::{ArchiveBuilder, ArchiveConfig};
use crate::cancel::CancelToken;
use crate::error::{BackupError, BackupFailure, Result};
use crate::jalali::{format_jalali_datetime, format_jalali_stamp};
use crate::logger::{LogCallback, ProgressCallback, RunLogger};
use crate::naming::{backup_dir_name, create_unique_dir, file_stamp, project_slug, NameBuilder};
use crate::output::{escape_html, html_document};
use crate::steps::{
    api_bundles, code_bundles, configs, paths, root_files, search, trees, StepContext,
    StepReport, StepStats,
};
use crate::time::{TimeResolver, TimeResult};
use chrono::{DateTime, Local};
use codestash_core::{BackupProfileConfig, BackupStep, OutputFormat, ProjectConfig, SearchSetConfig};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// Statistics key of the archive phase.
pub const ARCHIVE_STATS_KEY: &str = "archive";

/// Per-run overrides of the profile. `None` keeps the profile's value.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub note: Option<String>,
    pub use_network_time: Option<bool>,
    pub skip_archive: Option<bool>,
    pub include_project_root_files: Option<bool>,

    /// Step names; unknown names are dropped with a warning
    pub include_steps: Option<Vec<String>>,

    /// Search sets to run; empty or `None` runs every configured set
    pub search_set_ids: Option<Vec<String>>,

    pub compression_level: Option<u32>,
}

impl RunOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

/// Terminal or current state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Everything a run produced, populated phase by phase.
#[derive(Debug, Clone, Serialize)]
pub struct BackupResult {
    pub run_id: Uuid,
    pub project_id: String,
    pub profile_id: String,

    /// The run's backup directory, planned or created
    pub backup_root_path: Option<PathBuf>,

    pub created_files: Vec<PathBuf>,
    pub created_directories: Vec<PathBuf>,
    pub archive_path: Option<PathBuf>,
    pub archive_checksum: Option<String>,

    /// Step name to its counters
    pub stats: BTreeMap<String, StepStats>,

    pub time_source: Option<String>,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub duration_seconds: f64,
    pub is_dry_run: bool,
    pub status: RunStatus,
}

impl BackupResult {
    fn new(project: &ProjectConfig, profile: &BackupProfileConfig, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            project_id: project.id.clone(),
            profile_id: profile.id.clone(),
            backup_root_path: None,
            created_files: Vec::new(),
            created_directories: Vec::new(),
            archive_path: None,
            archive_checksum: None,
            stats: BTreeMap::new(),
            time_source: None,
            started_at: Local::now(),
            finished_at: None,
            duration_seconds: 0.0,
            is_dry_run: dry_run,
            status: RunStatus::Running,
        }
    }

    fn record(&mut self, key: &str, report: StepReport) {
        self.created_files.extend(report.files);
        self.stats.insert(key.to_string(), report.stats);
    }

    fn record_planned(&mut self, key: &str, count: u64) {
        self.stats.insert(key.to_string(), StepStats::planned(count));
    }
}

/// One unit of the phase sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Step(BackupStep),
    Archive,
    Summary,
}

impl Phase {
    fn label(&self) -> &'static str {
        match self {
            Phase::Step(step) => step.label(),
            Phase::Archive => "Archive",
            Phase::Summary => "Summary",
        }
    }
}

/// Effective settings of one run after applying overrides.
#[derive(Debug)]
struct RunPlan {
    steps: BTreeSet<BackupStep>,
    phases: Vec<Phase>,
    search_sets: Vec<SearchSetConfig>,
    use_network_time: bool,
    skip_archive: bool,
    compression_level: u32,
}

impl RunPlan {
    /// Phase count including pre-checks.
    fn total(&self) -> usize {
        self.phases.len() + 1
    }
}

/// State established by pre-checks, read-only afterwards.
#[derive(Debug)]
struct RunSetup {
    backup_dir: PathBuf,
    names: NameBuilder,
    time: TimeResult,
}

/// Runs backups of one project under one profile.
pub struct BackupEngine {
    project: ProjectConfig,
    profile: BackupProfileConfig,
    search_sets: Vec<SearchSetConfig>,
    logger: RunLogger,
    progress_callback: Option<ProgressCallback>,
    cancel: CancelToken,
    time_resolver: Option<TimeResolver>,
}

impl BackupEngine {
    pub fn new(project: ProjectConfig, profile: BackupProfileConfig) -> Self {
        let logger = RunLogger::new(&project.id, &profile.id, None);
        Self {
            project,
            profile,
            search_sets: Vec::new(),
            logger,
            progress_callback: None,
            cancel: CancelToken::new(),
            time_resolver: None,
        }
    }

    /// Search sets available to the keyword search step.
    pub fn with_search_sets(mut self, search_sets: Vec<SearchSetConfig>) -> Self {
        self.search_sets = search_sets;
        self
    }

    pub fn with_log_callback(mut self, callback: LogCallback) -> Self {
        self.logger = RunLogger::new(&self.project.id, &self.profile.id, Some(callback));
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the network time chain, used when network time is enabled.
    pub fn with_time_resolver(mut self, resolver: TimeResolver) -> Self {
        self.time_resolver = Some(resolver);
        self
    }

    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    pub fn profile(&self) -> &BackupProfileConfig {
        &self.profile
    }

    /// Token observed by this engine; cancelling any clone stops the run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Execute one run.
    ///
    /// On failure the returned [`BackupFailure`] carries every file and
    /// statistic recorded before the failing phase. Timing is recorded on
    /// every path.
    pub async fn run(&self, options: RunOptions) -> std::result::Result<BackupResult, BackupFailure> {
        let mut result = BackupResult::new(&self.project, &self.profile, options.dry_run);
        let clock = Instant::now();

        let outcome = self.execute(&options, &mut result).await;

        result.finished_at = Some(Local::now());
        result.duration_seconds = (clock.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;

        match outcome {
            Ok(()) => {
                result.status = RunStatus::Completed;
                Ok(result)
            }
            Err(error) => {
                if error.is_cancelled() {
                    result.status = RunStatus::Cancelled;
                    self.logger.warn("CANCEL", &error.to_string());
                } else {
                    result.status = RunStatus::Failed;
                    self.logger.error("ERROR", &error.to_string());
                }
                Err(BackupFailure::new(error, result))
            }
        }
    }

    async fn execute(&self, options: &RunOptions, result: &mut BackupResult) -> Result<()> {
        let plan = self.plan(options);
        let total = plan.total();

        self.emit_progress(1, total, "Pre-checks");
        let setup = self.prechecks(options, &plan, result).await?;

        let output_dirs = [
            self.project.backup_root.clone(),
            self.project.archive_output_dir.clone(),
        ];
        let ctx = StepContext {
            project_root: &self.project.project_root,
            backup_dir: &setup.backup_dir,
            output_dirs: &output_dirs,
            profile: &self.profile,
            names: &setup.names,
            logger: &self.logger,
            cancel: &self.cancel,
        };

        for (offset, phase) in plan.phases.iter().enumerate() {
            self.emit_progress(offset + 2, total, phase.label());
            match phase {
                Phase::Step(step) => {
                    self.cancel.check()?;
                    self.run_step(*step, &ctx, &plan, &setup, options, result)?;
                }
                Phase::Archive => {
                    self.cancel.check()?;
                    self.run_archive(&setup, &plan, options.dry_run, result)?;
                }
                Phase::Summary => {
                    self.logger.info(
                        "SUMMARY",
                        &format!(
                            "Backup completed. Dry run={}, archive={}",
                            options.dry_run,
                            if result.archive_path.is_some() {
                                "created"
                            } else {
                                "skipped"
                            }
                        ),
                    );
                }
            }
        }

        Ok(())
    }

    /// Resolve overrides into the effective step set and phase list.
    fn plan(&self, options: &RunOptions) -> RunPlan {
        let mut steps: BTreeSet<BackupStep> = match &options.include_steps {
            Some(names) => {
                let unknown: Vec<&str> = names
                    .iter()
                    .map(String::as_str)
                    .filter(|name| BackupStep::parse(name).is_none())
                    .collect();
                if !unknown.is_empty() {
                    self.logger.warn(
                        "WARN",
                        &format!("Ignoring unknown include_steps: {}", unknown.join(", ")),
                    );
                }
                names.iter().filter_map(|name| BackupStep::parse(name)).collect()
            }
            None => self.profile.include_steps.iter().copied().collect(),
        };

        if options.include_project_root_files == Some(true) {
            steps.insert(BackupStep::ProjectRootFiles);
        }
        if options.include_project_root_files == Some(false) || self.profile.no_root_files {
            steps.remove(&BackupStep::ProjectRootFiles);
        }

        let search_sets = if steps.contains(&BackupStep::KeywordSearch) {
            self.resolve_search_sets(options.search_set_ids.as_deref())
        } else {
            Vec::new()
        };
        if self.search_sets.is_empty() && steps.remove(&BackupStep::KeywordSearch) {
            self.logger
                .debug("SEARCH", "No search sets configured; keyword search disabled");
        }

        let skip_archive = options.skip_archive.unwrap_or(self.profile.skip_archive);

        let mut phases: Vec<Phase> = BackupStep::ALL
            .into_iter()
            .filter(|step| steps.contains(step))
            .filter(|step| {
                // Both config steps share the Configs phase.
                !(*step == BackupStep::TsconfigBundle && steps.contains(&BackupStep::Configs))
            })
            .map(Phase::Step)
            .collect();
        if !skip_archive {
            phases.push(Phase::Archive);
        }
        phases.push(Phase::Summary);

        RunPlan {
            steps,
            phases,
            search_sets,
            use_network_time: options
                .use_network_time
                .unwrap_or(self.profile.use_network_time),
            skip_archive,
            compression_level: options
                .compression_level
                .unwrap_or(self.profile.compression_level),
        }
    }

    fn resolve_search_sets(&self, ids: Option<&[String]>) -> Vec<SearchSetConfig> {
        match ids {
            None | Some([]) => self.search_sets.clone(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| {
                    let found = self.search_sets.iter().find(|set| &set.id == id).cloned();
                    if found.is_none() {
                        self.logger
                            .warn("WARN", &format!("Search set '{}' not found; skipping.", id));
                    }
                    found
                })
                .collect(),
        }
    }

    async fn prechecks(
        &self,
        options: &RunOptions,
        plan: &RunPlan,
        result: &mut BackupResult,
    ) -> Result<RunSetup> {
        self.logger.info("PRECHECK", "Validating project paths...");
        self.cancel.check()?;

        let project_root = &self.project.project_root;
        if !project_root.is_dir() {
            return Err(BackupError::config(format!(
                "Project root does not exist or is not a directory: {}",
                project_root.display()
            )));
        }

        self.ensure_dir(&self.project.backup_root, "backup root", options.dry_run)?;
        if !plan.skip_archive {
            self.ensure_dir(
                &self.project.archive_output_dir,
                "archive output directory",
                options.dry_run,
            )?;
        }

        self.logger.info("PRECHECK", "Resolving time source...");
        let time = match (&self.time_resolver, plan.use_network_time) {
            (Some(resolver), _) => resolver.resolve(self.project.timezone, plan.use_network_time).await,
            (None, true) => {
                TimeResolver::network()
                    .resolve(self.project.timezone, true)
                    .await
            }
            (None, false) => TimeResult::system(self.project.timezone),
        };
        result.time_source = Some(time.source.clone());
        self.logger.info(
            "PRECHECK",
            &format!("Time source: {} ({})", time.source, time.datetime.to_rfc3339()),
        );
        self.cancel.check()?;

        let dir_name = backup_dir_name(&format_jalali_stamp(&time.datetime));
        let backup_dir = if options.dry_run {
            let planned = self.project.backup_root.join(&dir_name);
            self.logger.info(
                "PRECHECK",
                &format!("DRY RUN: backup directory planned at {}", planned.display()),
            );
            planned
        } else {
            let created = create_unique_dir(&self.project.backup_root, &dir_name)?;
            result.created_directories.push(created.clone());
            self.logger
                .info("PRECHECK", &format!("Backup directory: {}", created.display()));
            created
        };
        result.backup_root_path = Some(backup_dir.clone());

        let names = NameBuilder::new(
            &backup_dir,
            project_slug(&self.project),
            file_stamp(&time.datetime),
            &self.profile.output,
        );

        let setup = RunSetup {
            backup_dir,
            names,
            time,
        };

        if let Some(note) = options.note.as_deref().filter(|n| !n.trim().is_empty()) {
            if options.dry_run {
                self.logger.info("PRECHECK", "DRY RUN: would write backup note");
            } else {
                let path = self.write_note(&setup, note)?;
                result.created_files.push(path);
            }
        }

        Ok(setup)
    }

    /// Create `dir` if missing, or report intent on dry runs. An existing
    /// non-directory is a configuration error.
    fn ensure_dir(&self, dir: &Path, what: &str, dry_run: bool) -> Result<()> {
        if dir.is_dir() {
            return Ok(());
        }
        if dir.exists() {
            return Err(BackupError::config(format!(
                "The {} is not a directory: {}",
                what,
                dir.display()
            )));
        }
        if dry_run {
            self.logger.info(
                "PRECHECK",
                &format!("DRY RUN: would create {}: {}", what, dir.display()),
            );
        } else {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    fn write_note(&self, setup: &RunSetup, note: &str) -> Result<PathBuf> {
        let source = &setup.time.source;
        let iso = setup.time.datetime.to_rfc3339();
        let jalali = format_jalali_datetime(&setup.time.datetime);

        let content = match self.profile.output.format {
            OutputFormat::Txt => format!(
                "Time source: {}\nISO datetime: {}\nJalali datetime: {}\n\n{}\n",
                source, iso, jalali, note
            ),
            OutputFormat::Md => format!(
                "# Backup Note\n\n- **Time source:** {}\n- **ISO datetime:** {}\n- **Jalali datetime:** {}\n\n{}\n",
                source, iso, jalali, note
            ),
            OutputFormat::Html => html_document(
                "Backup Note",
                &format!(
                    "<h2>Backup Note</h2>\n<p><strong>Time source:</strong> {}<br/>\
                     <strong>ISO datetime:</strong> {}<br/>\
                     <strong>Jalali datetime:</strong> {}</p>\n<p>{}</p>\n",
                    escape_html(source),
                    iso,
                    jalali,
                    escape_html(note)
                ),
            ),
        };

        let path = setup.names.path("backup_note");
        fs::write(&path, content)?;
        Ok(path)
    }

    fn run_step(
        &self,
        step: BackupStep,
        ctx: &StepContext<'_>,
        plan: &RunPlan,
        setup: &RunSetup,
        options: &RunOptions,
        result: &mut BackupResult,
    ) -> Result<()> {
        if matches!(step, BackupStep::Configs | BackupStep::TsconfigBundle) {
            return self.run_config_steps(ctx, plan, options.dry_run, result);
        }

        let (tag, intent) = dry_run_intent(step);
        if options.dry_run {
            let planned = if step == BackupStep::KeywordSearch {
                let ids: Vec<&str> = plan.search_sets.iter().map(|s| s.id.as_str()).collect();
                self.logger.info(
                    tag,
                    &format!("DRY RUN: would run keyword search for sets: [{}]", ids.join(", ")),
                );
                plan.search_sets.len() as u64
            } else {
                self.logger.info(tag, &format!("DRY RUN: {}", intent));
                1
            };
            result.record_planned(step.as_str(), planned);
            return Ok(());
        }

        let mut report = StepReport::default();
        let outcome = match step {
            BackupStep::Trees => trees::generate_trees(ctx, &mut report),
            BackupStep::CodeTxt => code_bundles::generate_text_bundles(ctx, &mut report),
            BackupStep::TsTsxMdBundles => code_bundles::generate_markdown_bundles(ctx, &mut report),
            BackupStep::FullTsTsxBundle => {
                code_bundles::generate_full_markdown_bundle(ctx, &mut report)
            }
            BackupStep::ApiGroupBundles => api_bundles::generate_api_bundles(ctx, &mut report),
            BackupStep::Paths => paths::generate_paths(ctx, &mut report),
            BackupStep::KeywordSearch => {
                search::run_search_sets(ctx, &plan.search_sets, &mut report)
            }
            BackupStep::ProjectRootFiles => root_files::generate_root_files(
                ctx,
                &format_jalali_datetime(&setup.time.datetime),
                options.note.as_deref(),
                &mut report,
            ),
            BackupStep::Configs | BackupStep::TsconfigBundle => {
                return self.run_config_steps(ctx, plan, options.dry_run, result)
            }
        };
        self.finish_step(step, tag, report, outcome, result)
    }

    /// Record what a step wrote, including output left by a step that was
    /// cancelled or failed partway.
    fn finish_step(
        &self,
        step: BackupStep,
        tag: &str,
        report: StepReport,
        outcome: Result<()>,
        result: &mut BackupResult,
    ) -> Result<()> {
        match &outcome {
            Ok(()) => self.logger.info(
                tag,
                &format!("{}: {} files written", step.label(), report.files.len()),
            ),
            Err(_) if !report.files.is_empty() => self.logger.warn(
                tag,
                &format!(
                    "{} stopped after writing {} files",
                    step.label(),
                    report.files.len()
                ),
            ),
            Err(_) => {}
        }
        if outcome.is_ok() || report != StepReport::default() {
            result.record(step.as_str(), report);
        }
        outcome
    }

    /// The shared config phase; each bundle runs only if its step is enabled.
    fn run_config_steps(
        &self,
        ctx: &StepContext<'_>,
        plan: &RunPlan,
        dry_run: bool,
        result: &mut BackupResult,
    ) -> Result<()> {
        for step in [BackupStep::Configs, BackupStep::TsconfigBundle] {
            if !plan.steps.contains(&step) {
                continue;
            }
            let (tag, intent) = dry_run_intent(step);
            if dry_run {
                self.logger.info(tag, &format!("DRY RUN: {}", intent));
                result.record_planned(step.as_str(), 1);
                continue;
            }
            self.cancel.check()?;
            let mut report = StepReport::default();
            let outcome = if step == BackupStep::Configs {
                configs::generate_configs(ctx, &mut report)
            } else {
                configs::generate_tsconfigs(ctx, &mut report)
            };
            self.finish_step(step, tag, report, outcome, result)?;
        }
        Ok(())
    }

    fn run_archive(
        &self,
        setup: &RunSetup,
        plan: &RunPlan,
        dry_run: bool,
        result: &mut BackupResult,
    ) -> Result<()> {
        if dry_run {
            self.logger
                .info("ARCHIVE", "DRY RUN: archive creation skipped.");
            result.record_planned(ARCHIVE_STATS_KEY, 1);
            return Ok(());
        }

        let config = ArchiveConfig::new(self.profile.archive_format)
            .with_compression_level(plan.compression_level);
        let archive = ArchiveBuilder::new(config).create(
            &setup.backup_dir,
            &self.project.archive_output_dir,
            &self.cancel,
        )?;
        self.logger.info(
            "ARCHIVE",
            &format!(
                "Archive created: {} ({} entries, {} bytes)",
                archive.archive_path.display(),
                archive.entry_count,
                archive.size_bytes
            ),
        );

        let mut stats = StepStats::new();
        stats.set("created", 1);
        stats.set("entries", archive.entry_count as u64);
        stats.set("size_bytes", archive.size_bytes);
        result.stats.insert(ARCHIVE_STATS_KEY.to_string(), stats);
        result.archive_checksum = Some(archive.checksum);
        result.archive_path = Some(archive.archive_path);
        Ok(())
    }

    fn emit_progress(&self, current: usize, total: usize, label: &str) {
        if let Some(callback) = &self.progress_callback {
            callback(current, total, label);
        }
    }
}

impl std::fmt::Debug for BackupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupEngine")
            .field("project", &self.project.id)
            .field("profile", &self.profile.id)
            .field("search_sets", &self.search_sets.len())
            .field("cancel", &self.cancel)
            .field("time_resolver", &self.time_resolver)
            .finish()
    }
}

/// Log tag and dry-run intent of a step.
fn dry_run_intent(step: BackupStep) -> (&'static str, &'static str) {
    match step {
        BackupStep::Trees => ("TREES", "would generate directory trees."),
        BackupStep::CodeTxt => ("CODE", "would generate code text bundles."),
        BackupStep::TsTsxMdBundles => ("CODE", "would generate TS/TSX markdown bundles."),
        BackupStep::FullTsTsxBundle => ("CODE", "would generate full TS/TSX bundle."),
        BackupStep::Configs => ("CONFIGS", "would generate config bundles."),
        BackupStep::TsconfigBundle => ("CONFIGS", "would generate TSConfig bundle."),
        BackupStep::ApiGroupBundles => ("API_BUNDLES", "would generate API group bundles."),
        BackupStep::Paths => ("PATHS", "would generate path listings."),
        BackupStep::KeywordSearch => ("SEARCH", "would run keyword search."),
        BackupStep::ProjectRootFiles => ("ROOT", "would write Tree.md and AllCode_Backup.md."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn engine(project_root: &Path, backup_root: &Path) -> BackupEngine {
        let project = ProjectConfig::new("web", project_root.to_path_buf(), backup_root.to_path_buf());
        BackupEngine::new(project, BackupProfileConfig::new("standard"))
    }

    fn steps(names: &[&str]) -> Option<Vec<String>> {
        Some(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_plan_drops_unknown_steps_with_warning() {
        let dir = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let engine = engine(dir.path(), dir.path())
            .with_log_callback(Arc::new(move |m: &str| sink.lock().unwrap().push(m.to_string())));

        let plan = engine.plan(&RunOptions {
            include_steps: steps(&["paths", "bogus", "trees"]),
            skip_archive: Some(true),
            ..RunOptions::default()
        });

        assert_eq!(
            plan.phases,
            vec![
                Phase::Step(BackupStep::Trees),
                Phase::Step(BackupStep::Paths),
                Phase::Summary
            ]
        );
        assert_eq!(plan.total(), 4);
        assert!(seen
            .lock()
            .unwrap()
            .contains(&"[WARN] Ignoring unknown include_steps: bogus".to_string()));
    }

    #[test]
    fn test_plan_merges_config_phases() {
        let dir = TempDir::new().unwrap();
        let engine = engine(dir.path(), dir.path());

        let both = engine.plan(&RunOptions {
            include_steps: steps(&["tsconfig_bundle", "configs"]),
            ..RunOptions::default()
        });
        assert_eq!(
            both.phases,
            vec![Phase::Step(BackupStep::Configs), Phase::Archive, Phase::Summary]
        );

        let ts_only = engine.plan(&RunOptions {
            include_steps: steps(&["tsconfig_bundle"]),
            ..RunOptions::default()
        });
        assert_eq!(ts_only.phases[0].label(), "TSConfig bundle");
    }

    #[test]
    fn test_plan_root_files_override() {
        let dir = TempDir::new().unwrap();
        let engine = engine(dir.path(), dir.path());

        let added = engine.plan(&RunOptions {
            include_project_root_files: Some(true),
            ..RunOptions::default()
        });
        assert!(added.steps.contains(&BackupStep::ProjectRootFiles));

        let removed = engine.plan(&RunOptions {
            include_steps: steps(&["project_root_files", "trees"]),
            include_project_root_files: Some(false),
            ..RunOptions::default()
        });
        assert!(!removed.steps.contains(&BackupStep::ProjectRootFiles));

        let mut profile = BackupProfileConfig::new("lean");
        profile.no_root_files = true;
        let project = ProjectConfig::new("web", dir.path().to_path_buf(), dir.path().to_path_buf());
        let lean = BackupEngine::new(project, profile).plan(&RunOptions {
            include_project_root_files: Some(true),
            ..RunOptions::default()
        });
        assert!(!lean.steps.contains(&BackupStep::ProjectRootFiles));
    }

    #[test]
    fn test_keyword_search_needs_search_sets() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            include_steps: steps(&["keyword_search"]),
            search_set_ids: steps(&["auth", "missing"]),
            ..RunOptions::default()
        };

        let without = engine(dir.path(), dir.path()).plan(&options);
        assert!(!without.steps.contains(&BackupStep::KeywordSearch));

        let with = engine(dir.path(), dir.path())
            .with_search_sets(vec![
                SearchSetConfig::new("auth", vec!["jwt".to_string()]),
                SearchSetConfig::new("db", vec!["sql".to_string()]),
            ])
            .plan(&options);
        assert!(with.steps.contains(&BackupStep::KeywordSearch));
        let ids: Vec<&str> = with.search_sets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["auth"]);
    }

    #[tokio::test]
    async fn test_missing_project_root_is_config_error() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir.path().join("missing"), dir.path());

        let failure = engine.run(RunOptions::default()).await.unwrap_err();
        assert!(matches!(failure.error, BackupError::Config(_)));
        assert_eq!(failure.partial.status, RunStatus::Failed);
        assert!(failure.partial.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("a.ts"), "a").unwrap();
        let out = TempDir::new().unwrap();
        let backup_root = out.path().join("backups");

        let result = engine(project.path(), &backup_root)
            .run(RunOptions {
                note: Some("hello".to_string()),
                ..RunOptions::dry_run()
            })
            .await
            .unwrap();

        assert!(!backup_root.exists());
        assert!(result.created_files.is_empty());
        assert!(result.stats.values().all(StepStats::is_planned));
        assert_eq!(result.stats.get(ARCHIVE_STATS_KEY), Some(&StepStats::planned(1)));
        assert_eq!(result.time_source.as_deref(), Some("system"));
    }

    #[tokio::test]
    async fn test_progress_reports_every_phase() {
        let project = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        engine(project.path(), out.path())
            .with_progress_callback(Arc::new(move |cur: usize, total: usize, label: &str| {
                sink.lock().unwrap().push((cur, total, label.to_string()))
            }))
            .run(RunOptions {
                include_steps: steps(&["paths"]),
                ..RunOptions::dry_run()
            })
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        let labels: Vec<&str> = seen.iter().map(|(_, _, l)| l.as_str()).collect();
        assert_eq!(labels, vec!["Pre-checks", "Path listings", "Archive", "Summary"]);
        assert!(seen.iter().all(|(_, total, _)| *total == 4));
        assert_eq!(seen.last().unwrap().0, 4);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let project = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let engine = engine(project.path(), out.path());
        engine.cancel();

        let failure = engine.run(RunOptions::default()).await.unwrap_err();
        assert!(failure.error.is_cancelled());
        assert_eq!(failure.partial.status, RunStatus::Cancelled);
        assert!(failure.partial.backup_root_path.is_none());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
