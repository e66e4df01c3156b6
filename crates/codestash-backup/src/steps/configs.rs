//! Configuration bundles.

use super::{StepContext, StepReport};
use crate::error::Result;
use crate::scanning::walk;
use std::path::PathBuf;

/// Build, lint, container and package manifests collected by name.
pub const CONFIG_FILENAMES: &[&str] = &[
    "package.json",
    "nx.json",
    "next.config.js",
    "next.config.mjs",
    "jest.config.js",
    "jest.config.mjs",
    "jest.config.ts",
    ".eslintrc",
    ".eslintrc.js",
    ".eslintrc.cjs",
    ".prettierrc",
    ".prettierrc.js",
    ".prettierrc.cjs",
    "docker-compose.yml",
    "docker-compose.yaml",
    "Dockerfile",
];

/// Root-level TypeScript configurations; each area's `tsconfig.json` is
/// appended at run time.
pub const ROOT_TSCONFIGS: &[&str] = &["tsconfig.json", "tsconfig.base.json"];

/// Every file in the project whose name is a known configuration file,
/// written as `configs`. The bundle is written even when nothing matches.
pub fn generate_configs(ctx: &StepContext<'_>, report: &mut StepReport) -> Result<()> {
    ctx.cancel.check()?;

    let mut files = Vec::new();
    for path in walk(&ctx.scan(ctx.project_root)) {
        ctx.cancel.check()?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if CONFIG_FILENAMES.contains(&name.as_str()) && !name.starts_with("tsconfig") {
            files.push(path);
        }
    }
    files.sort();

    let out = ctx.names.path("configs");
    ctx.write_bundle(report, &files, ctx.project_root, &out, ctx.output())?;
    Ok(())
}

/// TypeScript configurations addressed by relative path, written as
/// `tsconfigs`. Missing files are skipped silently.
pub fn generate_tsconfigs(ctx: &StepContext<'_>, report: &mut StepReport) -> Result<()> {
    ctx.cancel.check()?;

    let candidates = ROOT_TSCONFIGS
        .iter()
        .map(|rel| rel.to_string())
        .chain(
            ctx.profile
                .areas
                .iter()
                .map(|area| format!("{}/tsconfig.json", area.trim_end_matches('/'))),
        );
    let files: Vec<PathBuf> = candidates
        .map(|rel| ctx.project_root.join(rel))
        .filter(|path| path.is_file())
        .collect();

    let out = ctx.names.path("tsconfigs");
    ctx.write_bundle(report, &files, ctx.project_root, &out, ctx.output())?;
    Ok(())
}
