//! Path listings.

use super::{StepContext, StepReport};
use crate::error::Result;
use crate::output::write_listing;
use crate::scanning::{extension_of, walk};
use std::path::PathBuf;

/// Joins the TS-only listing into a single line.
pub const TS_PATH_SEPARATOR: &str = "/|\\";

/// `paths`: every scanned path, one per line. `paths_ts`: the TS-family
/// subset joined by [`TS_PATH_SEPARATOR`]. Paths are absolute and sorted.
pub fn generate_paths(ctx: &StepContext<'_>, report: &mut StepReport) -> Result<()> {
    ctx.cancel.check()?;
    let format = ctx.output().format;

    let mut all: Vec<PathBuf> = Vec::new();
    for path in walk(&ctx.scan(ctx.project_root)) {
        ctx.cancel.check()?;
        all.push(path);
    }
    all.sort();

    let listing = all
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    let out = ctx.names.path("paths");
    write_listing(&out, format, "paths", Some("All paths"), &listing)?;
    report.push_file(out);
    report.stats.set("paths_total", all.len() as u64);

    ctx.cancel.check()?;
    let ts: Vec<String> = all
        .iter()
        .filter(|p| {
            ctx.profile
                .allowed_ts_extensions
                .contains(&extension_of(p))
        })
        .map(|p| p.display().to_string())
        .collect();
    let out = ctx.names.path("paths_ts");
    write_listing(
        &out,
        format,
        "paths_ts",
        Some("TypeScript-only paths"),
        &ts.join(TS_PATH_SEPARATOR),
    )?;
    report.push_file(out);
    report.stats.set("ts_paths_total", ts.len() as u64);

    Ok(())
}
