//! Bundle command: universal bundling of any source tree

use anyhow::{anyhow, Result};
use camino::Utf8PathBuf;
use clap::Args;
use codestash_backup::universal::{collect_backup_files, parse_format, EXTENSION_PRESETS};
use codestash_backup::{
    run_universal_backup, CancelToken, PhaseProgress, UniversalBackupConfig, UniversalBackupStats,
};
use codestash_core::{OutputConfig, OutputFormat, SeparatorStyle};

use crate::output;

#[derive(Args, Debug)]
pub struct BundleArgs {
    /// Source directory to bundle
    pub source: Utf8PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: Utf8PathBuf,

    /// Output file name without extension
    #[arg(long, default_value = "backup")]
    pub name: String,

    /// File extensions to include (comma-separated, e.g. .ts,.tsx)
    #[arg(short, long, value_delimiter = ',')]
    pub ext: Vec<String>,

    /// Named extension presets (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub preset: Vec<String>,

    /// Regular expressions excluding matching relative paths
    #[arg(short = 'x', long = "exclude")]
    pub exclude_patterns: Vec<String>,

    /// Output format: txt, md or html
    #[arg(short, long, default_value = "txt", value_parser = format_arg)]
    pub format: OutputFormat,

    /// Maximum KB read per file before truncating
    #[arg(long)]
    pub max_kb: Option<u64>,

    /// Write one output per top-level folder
    #[arg(long)]
    pub split: bool,

    /// Include hidden files and folders
    #[arg(long)]
    pub include_hidden: bool,

    /// Prefix every line with its number
    #[arg(long)]
    pub line_numbers: bool,

    /// List matching files without writing anything
    #[arg(long)]
    pub list: bool,

    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

fn format_arg(value: &str) -> std::result::Result<OutputFormat, String> {
    parse_format(value).ok_or_else(|| format!("unknown format '{}' (expected txt, md or html)", value))
}

impl BundleArgs {
    fn to_config(&self) -> Result<UniversalBackupConfig> {
        let unknown: Vec<&str> = self
            .preset
            .iter()
            .map(String::as_str)
            .filter(|name| !EXTENSION_PRESETS.iter().any(|(preset, _)| preset == name))
            .collect();
        if !unknown.is_empty() {
            let known: Vec<&str> = EXTENSION_PRESETS.iter().map(|(name, _)| *name).collect();
            return Err(anyhow!(
                "Unknown preset(s): {} (available: {})",
                unknown.join(", "),
                known.join(", ")
            ));
        }

        let separator_style = match self.format {
            OutputFormat::Md => SeparatorStyle::Markdown,
            OutputFormat::Txt | OutputFormat::Html => SeparatorStyle::Equals,
        };
        let mut config = UniversalBackupConfig::new(self.source.as_std_path(), self.output.as_std_path())
            .with_output_filename(&self.name)
            .with_presets(self.preset.iter().cloned())
            .with_exclude_patterns(self.exclude_patterns.iter().cloned())
            .with_split_by_folder(self.split)
            .with_exclude_hidden(!self.include_hidden)
            .with_output(OutputConfig {
                format: self.format,
                separator_style,
                include_line_numbers: self.line_numbers,
                dynamic_names: false,
                ..OutputConfig::default()
            });
        if !self.ext.is_empty() {
            config = config.with_extensions(self.ext.iter().cloned());
        } else if !self.preset.is_empty() {
            config = config.with_extensions(Vec::<String>::new());
        }
        if let Some(max_kb) = self.max_kb {
            config = config.with_max_file_kb(max_kb);
        }
        Ok(config)
    }
}

pub async fn run(args: BundleArgs) -> Result<()> {
    if !args.source.is_dir() {
        return Err(anyhow!("Source is not a directory: {}", args.source));
    }
    let config = args.to_config()?;
    let cancel = CancelToken::new();

    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    if args.list {
        let (files, excluded) = collect_backup_files(&config, &cancel)?;
        for file in &files {
            println!("{}", file.relative_path);
        }
        if !args.json {
            output::info(&format!(
                "{} files match, {} excluded",
                files.len(),
                excluded
            ));
        }
        return Ok(());
    }

    if !args.json {
        output::header("Bundle Source Tree");
        output::kv("Source", args.source.as_str());
        output::kv("Output", args.output.as_str());
        let extensions: Vec<String> = config.all_extensions().into_iter().collect();
        output::kv("Extensions", &extensions.join(" "));
        println!();
    }

    let progress = PhaseProgress::with_unit(args.json, "files");
    let callback = progress.callback();
    let stats = tokio::task::spawn_blocking(move || {
        run_universal_backup(&config, &cancel, None, Some(callback))
    })
    .await??;
    progress.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_summary(&stats);
    }
    Ok(())
}

fn print_summary(stats: &UniversalBackupStats) {
    if stats.output_files_created == 0 {
        output::warning("No files matched; nothing written");
        return;
    }

    output::success("Bundle complete");
    output::kv("Files included", &stats.files_included.to_string());
    output::kv("Files excluded", &stats.files_excluded.to_string());
    if stats.files_truncated > 0 {
        output::kv("Truncated", &stats.files_truncated.to_string());
    }
    output::kv("Source size", &output::format_bytes(stats.total_size_bytes));
    for path in &stats.output_paths {
        output::kv("Output", &path.display().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(args: &[&str]) -> BundleArgs {
        let mut argv = vec!["codestash", "bundle"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Bundle(args) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = parse(&["src"]).to_config().unwrap();
        assert_eq!(config.output_filename, "backup");
        assert_eq!(config.output.format, OutputFormat::Txt);
        assert!(config.exclude_hidden);
        assert!(config.all_extensions().contains(".tsx"));
    }

    #[test]
    fn test_presets_replace_default_extensions() {
        let config = parse(&["src", "--preset", "python", "-f", "md"])
            .to_config()
            .unwrap();
        let extensions: Vec<String> = config.all_extensions().into_iter().collect();
        assert_eq!(extensions, vec![".py", ".pyi", ".pyx"]);
        assert_eq!(config.output.separator_style, SeparatorStyle::Markdown);
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let err = parse(&["src", "--preset", "cobol"]).to_config().unwrap_err();
        assert!(err.to_string().contains("Unknown preset(s): cobol"));
    }

    #[test]
    fn test_bad_format_rejected_by_parser() {
        assert!(Cli::try_parse_from(["codestash", "bundle", "src", "--format", "pdf"]).is_err());
    }

    #[tokio::test]
    async fn test_run_writes_bundle() {
        let source = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(source.path().join("src")).unwrap();
        std::fs::write(source.path().join("src/a.ts"), "export const a = 1;\n").unwrap();
        let out = tempfile::TempDir::new().unwrap();

        let args = parse(&[
            source.path().to_str().unwrap(),
            "--output",
            out.path().to_str().unwrap(),
            "--json",
        ]);
        run(args).await.unwrap();

        let bundle = std::fs::read_to_string(out.path().join("backup.txt")).unwrap();
        assert!(bundle.contains("src/a.ts"));
    }
}
