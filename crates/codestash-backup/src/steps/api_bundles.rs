//! API sources grouped by structural suffix.

use super::{StepContext, StepReport};
use crate::error::Result;
use crate::scanning::walk;
use std::path::PathBuf;

/// Group name and the file-name suffix that selects it.
pub const API_GROUPS: &[(&str, &str)] = &[
    ("services", ".service.ts"),
    ("controllers", ".controller.ts"),
    ("entities", ".entity.ts"),
    ("dtos", ".dto.ts"),
];

/// One `api_<group>` bundle per non-empty group under the profile's API
/// area. Headers are relative to the API area. Nothing is written when the
/// area does not exist.
pub fn generate_api_bundles(ctx: &StepContext<'_>, report: &mut StepReport) -> Result<()> {
    ctx.cancel.check()?;

    let api_root = ctx.project_root.join(&ctx.profile.api_area);
    if !api_root.is_dir() {
        ctx.logger.info(
            "API_BUNDLES",
            &format!("API area not found, skipping: {}", api_root.display()),
        );
        return Ok(());
    }

    let scan = ctx.scan(&api_root).with_extensions([".ts"]);
    let mut candidates: Vec<PathBuf> = Vec::new();
    for path in walk(&scan) {
        ctx.cancel.check()?;
        candidates.push(path);
    }
    candidates.sort();

    for (group, suffix) in API_GROUPS {
        let files: Vec<PathBuf> = candidates
            .iter()
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| name.to_string_lossy().ends_with(suffix))
            })
            .cloned()
            .collect();
        if files.is_empty() {
            continue;
        }

        let out = ctx.names.path(&format!("api_{}", group));
        ctx.write_bundle(report, &files, &api_root, &out, ctx.output())?;
    }

    Ok(())
}
