//! Keyword search bundles.

use super::{StepContext, StepReport};
use crate::error::Result;
use crate::output::BundleWriter;
use crate::scanning::{collect_sorted, relative_display};
use codestash_core::{OutputConfig, OutputFormat, SearchSetConfig, SeparatorStyle};
use std::path::Path;

/// Directory under the backup directory holding search results.
pub const SEARCH_DIR: &str = "search";

/// File name for a search set, with the id reduced to `[A-Za-z0-9_-]`.
pub fn search_file_name(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("Search_{}.md", safe)
}

/// Case-insensitive, match-any keyword test.
pub fn matches_any(text: &str, keywords_lower: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords_lower.iter().any(|k| lower.contains(k.as_str()))
}

fn search_output() -> OutputConfig {
    OutputConfig {
        format: OutputFormat::Md,
        separator_style: SeparatorStyle::Markdown,
        include_line_numbers: false,
        include_file_stats: false,
        wrap_in_code_block: true,
        ..OutputConfig::default()
    }
}

/// Run one set, writing every matching file in full. The result file is
/// written even when nothing matches. Returns the match count.
fn run_search_set(
    ctx: &StepContext<'_>,
    report: &mut StepReport,
    set: &SearchSetConfig,
    out: &Path,
) -> Result<u64> {
    let keywords: Vec<String> = set
        .keywords
        .iter()
        .filter(|k| !k.is_empty())
        .map(|k| k.to_lowercase())
        .collect();
    let scan = ctx
        .scan(ctx.project_root)
        .with_extensions(set.extensions.iter().cloned());

    let mut writer = BundleWriter::create(out, &search_output(), &set.label)?;
    report.track(out);
    for path in collect_sorted(&scan) {
        ctx.cancel.check()?;
        let content = ctx.read(&path);
        if !content.unreadable && matches_any(&content.text, &keywords) {
            writer.write_entry(&relative_display(&path, ctx.project_root), &content)?;
        }
    }
    let matches = writer.entries() as u64;
    writer.finish()?;
    Ok(matches)
}

/// Run each set into `search/Search_<id>.md`; stats map set id to the
/// number of matching files.
pub fn run_search_sets(
    ctx: &StepContext<'_>,
    sets: &[SearchSetConfig],
    report: &mut StepReport,
) -> Result<()> {
    let dir = ctx.backup_dir.join(SEARCH_DIR);

    for set in sets {
        ctx.cancel.check()?;
        let out = dir.join(search_file_name(&set.id));
        let matches = run_search_set(ctx, report, set, &out)?;
        ctx.logger.info(
            "SEARCH",
            &format!("Search set '{}': {} matching files", set.id, matches),
        );
        report.stats.set(set.id.clone(), matches);
    }

    Ok(())
}
