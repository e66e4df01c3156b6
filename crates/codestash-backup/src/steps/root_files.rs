//! Project-root helper files: `Tree.md` and `AllCode_Backup.md`.

use super::trees::render_tree;
use super::{StepContext, StepReport};
use crate::error::Result;
use crate::output::BundleWriter;
use crate::scanning::{collect_sorted, relative_display, walk};
use codestash_core::{OutputConfig, OutputFormat, SeparatorStyle};

pub const TREE_FILE: &str = "Tree.md";
pub const ALL_CODE_FILE: &str = "AllCode_Backup.md";

/// Write both helpers into the backup directory. Names are fixed and not
/// templated.
pub fn generate_root_files(
    ctx: &StepContext<'_>,
    jalali_datetime: &str,
    note: Option<&str>,
    report: &mut StepReport,
) -> Result<()> {
    ctx.cancel.check()?;

    let mut rel_paths = Vec::new();
    for path in walk(&ctx.scan(ctx.project_root)) {
        ctx.cancel.check()?;
        rel_paths.push(relative_display(&path, ctx.project_root));
    }
    rel_paths.sort();

    let tree_path = ctx.backup_dir.join(TREE_FILE);
    std::fs::write(
        &tree_path,
        format!("# Project Tree\n\n```text\n{}\n```\n", render_tree(&rel_paths)),
    )?;
    report.push_file(tree_path);

    let config = OutputConfig {
        format: OutputFormat::Md,
        separator_style: SeparatorStyle::Markdown,
        wrap_in_code_block: true,
        ..ctx.output().clone()
    };
    let files = collect_sorted(
        &ctx.scan(ctx.project_root)
            .with_extensions(ctx.profile.allowed_full_extensions.iter().cloned()),
    );

    let all_code_path = ctx.backup_dir.join(ALL_CODE_FILE);
    let mut writer = BundleWriter::create(&all_code_path, &config, "AllCode_Backup")?;
    report.track(&all_code_path);
    writer.write_text(&format!(
        "# All Code Backup\n\n- **Jalali datetime:** {}\n\n{}\n",
        jalali_datetime,
        note.filter(|n| !n.trim().is_empty()).unwrap_or("_No note provided._")
    ))?;
    for path in &files {
        ctx.cancel.check()?;
        let content = ctx.read(path);
        writer.write_entry(&relative_display(path, ctx.project_root), &content)?;
    }
    report.stats.set("files_included", writer.entries() as u64);
    writer.finish()?;
    report.push_file(all_code_path);

    Ok(())
}
