//! Full-text and markdown code bundles.

use super::{StepContext, StepReport};
use crate::error::Result;
use crate::scanning::{area_name, collect_sorted, project_areas};
use codestash_core::{OutputConfig, OutputFormat, SeparatorStyle};
use std::path::{Path, PathBuf};

/// Markdown bundles are fenced per file whatever the profile's format.
fn markdown_config(base: &OutputConfig) -> OutputConfig {
    OutputConfig {
        format: OutputFormat::Md,
        separator_style: SeparatorStyle::Markdown,
        wrap_in_code_block: true,
        ..base.clone()
    }
}

/// Write `root`'s files matching `extensions` to `out`. Empty selections
/// produce no file.
fn bundle_tree(
    ctx: &StepContext<'_>,
    report: &mut StepReport,
    root: &Path,
    extensions: &[String],
    out: PathBuf,
    config: &OutputConfig,
) -> Result<()> {
    ctx.cancel.check()?;
    let files = collect_sorted(&ctx.scan(root).with_extensions(extensions.iter().cloned()));
    if files.is_empty() {
        ctx.logger.debug("CODE", &format!("No files for {}", out.display()));
        return Ok(());
    }
    ctx.write_bundle(report, &files, root, &out, config)?;
    Ok(())
}

/// `<area>_code` per existing area and `all_code` for the whole project,
/// over the profile's full extension list in the profile's format.
pub fn generate_text_bundles(ctx: &StepContext<'_>, report: &mut StepReport) -> Result<()> {
    let extensions = &ctx.profile.allowed_full_extensions;

    for (area, root) in project_areas(ctx.project_root, &ctx.profile.areas) {
        let out = ctx.names.path(&format!("{}_code", area_name(area)));
        bundle_tree(ctx, report, &root, extensions, out, ctx.output())?;
    }
    let out = ctx.names.path("all_code");
    bundle_tree(ctx, report, ctx.project_root, extensions, out, ctx.output())

}

/// One markdown bundle per existing area over the TS extension family.
pub fn generate_markdown_bundles(ctx: &StepContext<'_>, report: &mut StepReport) -> Result<()> {
    let config = markdown_config(ctx.output());
    let md = OutputFormat::Md.extension();

    for (area, root) in project_areas(ctx.project_root, &ctx.profile.areas) {
        let out = ctx.names.path_with_ext(area_name(area), md);
        bundle_tree(ctx, report, &root, &ctx.profile.allowed_ts_extensions, out, &config)?;
    }

    Ok(())
}

/// A single markdown bundle of every TS-family file in the project.
pub fn generate_full_markdown_bundle(ctx: &StepContext<'_>, report: &mut StepReport) -> Result<()> {
    let config = markdown_config(ctx.output());
    let out = ctx.names.path_with_ext("ts_full_bundle", OutputFormat::Md.extension());
    bundle_tree(
        ctx,
        report,
        ctx.project_root,
        &ctx.profile.allowed_ts_extensions,
        out,
        &config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackupError;
    use crate::steps::testing::Fixture;

    fn project() -> Fixture {
        Fixture::new(&[
            ("apps/api/main.ts", "export const main = 1;\n"),
            ("apps/api/notes.md", "# api\n"),
            ("apps/site/page.tsx", "<Page />\n"),
            ("apps/site/page.test.tsx", "test\n"),
            ("tools/run.sh", "echo hi\n"),
            ("image.png", "png"),
        ])
    }

    #[test]
    fn test_text_bundles_per_area_and_whole_project() {
        let fx = project();
        let mut report = StepReport::default();
        generate_text_bundles(&fx.ctx(), &mut report).unwrap();

        assert!(fx.output_exists("api_code.txt"));
        assert!(fx.output_exists("site_code.txt"));
        assert!(fx.output_exists("all_code.txt"));
        assert!(!fx.output_exists("libs_code.txt"));
        assert_eq!(report.stats.get("files_written"), Some(3));
        // api: 2, site: 1, all: 4
        assert_eq!(report.stats.get("files_included"), Some(7));

        let api = fx.read_output("api_code.txt");
        assert!(api.contains("===== notes.md ====="));
        assert!(api.contains("===== main.ts ====="));

        let all = fx.read_output("all_code.txt");
        assert!(all.contains("===== apps/site/page.tsx ====="));
        assert!(all.contains("===== tools/run.sh ====="));
        assert!(!all.contains("page.test.tsx"));
        assert!(!all.contains("image.png"));
    }

    #[test]
    fn test_markdown_bundles_are_fenced_even_for_txt_profiles() {
        let fx = project();
        let mut report = StepReport::default();
        generate_markdown_bundles(&fx.ctx(), &mut report).unwrap();

        assert_eq!(report.stats.get("files_written"), Some(2));
        let api = fx.read_output("api.md");
        assert!(api.contains("## main.ts\n"));
        assert!(api.contains("```typescript\nexport const main = 1;\n```\n"));
        assert!(!api.contains("notes.md"));
    }

    #[test]
    fn test_full_markdown_bundle() {
        let fx = project();
        let mut report = StepReport::default();
        generate_full_markdown_bundle(&fx.ctx(), &mut report).unwrap();

        assert_eq!(report.stats.get("files_included"), Some(2));
        let bundle = fx.read_output("ts_full_bundle.md");
        assert!(bundle.contains("## apps/api/main.ts\n"));
        assert!(bundle.contains("## apps/site/page.tsx\n"));
        assert!(bundle.contains("```tsx\n<Page />\n```\n"));
    }

    #[test]
    fn test_empty_selection_writes_nothing() {
        let fx = Fixture::new(&[("notes.txt", "x")]);
        let mut report = StepReport::default();
        generate_full_markdown_bundle(&fx.ctx(), &mut report).unwrap();
        assert!(report.files.is_empty());
        assert!(!fx.output_exists("ts_full_bundle.md"));
    }

    #[test]
    fn test_cancelled_before_start_produces_no_output() {
        let fx = project();
        fx.cancel.cancel();
        let err = generate_text_bundles(&fx.ctx(), &mut StepReport::default()).unwrap_err();
        assert_eq!(err, BackupError::Cancelled);
        assert_eq!(std::fs::read_dir(fx.backup.path()).unwrap().count(), 0);
    }
}
