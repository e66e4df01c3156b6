//! Directory trees.

use super::{StepContext, StepReport};
use crate::error::Result;
use crate::output::write_listing;
use crate::scanning::{area_name, project_areas, relative_display, walk};
use std::path::Path;

/// Render sorted relative paths as an indented tree, printing only the
/// segments that diverge from the previous entry.
pub fn render_tree(sorted_paths: &[String]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut last: Vec<&str> = Vec::new();

    for rel in sorted_paths {
        let parts: Vec<&str> = rel.split('/').collect();
        let common = parts
            .iter()
            .zip(last.iter())
            .take_while(|(a, b)| a == b)
            .count();
        for (depth, part) in parts.iter().enumerate().skip(common) {
            lines.push(format!("{}{}", "  ".repeat(depth), part));
        }
        last = parts;
    }

    lines.join("\n")
}

/// Write one tree for `root`; returns the number of paths listed.
fn write_tree(
    ctx: &StepContext<'_>,
    report: &mut StepReport,
    root: &Path,
    base: &str,
    extensions: Option<&[String]>,
) -> Result<u64> {
    let mut scan = ctx.scan(root);
    if let Some(exts) = extensions {
        scan = scan.with_extensions(exts.iter().cloned());
    }

    let mut rel_paths = Vec::new();
    for path in walk(&scan) {
        ctx.cancel.check()?;
        rel_paths.push(relative_display(&path, root));
    }
    rel_paths.sort();

    let out = ctx.names.path(base);
    write_listing(&out, ctx.output().format, base, None, &render_tree(&rel_paths))?;
    report.push_file(out);
    Ok(rel_paths.len() as u64)
}

/// One tree per existing area, the whole project, and the project
/// restricted to the TS extension family.
pub fn generate_trees(ctx: &StepContext<'_>, report: &mut StepReport) -> Result<()> {
    for (area, root) in project_areas(ctx.project_root, &ctx.profile.areas) {
        let listed = write_tree(ctx, report, &root, &format!("{}_tree", area_name(area)), None)?;
        report.stats.add("paths_listed", listed);
    }
    let listed = write_tree(ctx, report, ctx.project_root, "tree", None)?;
    report.stats.add("paths_listed", listed);
    let listed = write_tree(
        ctx,
        report,
        ctx.project_root,
        "tree_ts",
        Some(ctx.profile.allowed_ts_extensions.as_slice()),
    )?;
    report.stats.add("paths_listed", listed);
    Ok(())
}
