//! Time command: resolve the backup clock and show both calendars

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use chrono_tz::Tz;
use codestash_backup::{
    format_jalali_datetime, format_jalali_stamp, naming::backup_dir_name, SpinnerProgress,
    TimeResolver, TimeResult,
};
use serde_json::json;

use crate::cli::TimeArgs;
use crate::commands::load_config;
use crate::output;

const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Tehran;

pub async fn run(args: TimeArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let tz = resolve_timezone(&args, config_path)?;

    let result = if args.offline {
        TimeResult::system(tz)
    } else {
        let spinner = (!args.json).then(|| SpinnerProgress::new("Resolving network time..."));
        let result = TimeResolver::network().resolve(tz, true).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        result
    };

    let jalali = format_jalali_datetime(&result.datetime);
    let dir_name = backup_dir_name(&format_jalali_stamp(&result.datetime));

    if args.json {
        let value = json!({
            "source": result.source,
            "timezone": tz.name(),
            "iso": result.datetime.to_rfc3339(),
            "jalali": jalali,
            "backup_dir": dir_name,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        output::kv("Source", &result.source);
        output::kv("Timezone", tz.name());
        output::kv("ISO", &result.datetime.to_rfc3339());
        output::kv("Jalali", &jalali);
        output::kv("Backup directory", &dir_name);
    }
    Ok(())
}

/// Explicit `--timezone`, then the named project's zone, then the default.
fn resolve_timezone(args: &TimeArgs, config_path: Option<&Utf8Path>) -> Result<Tz> {
    if let Some(name) = &args.timezone {
        return name
            .parse::<Tz>()
            .map_err(|_| anyhow!("Unknown timezone: {}", name));
    }
    if let Some(project) = &args.project {
        let config = load_config(config_path)?;
        return Ok(config.project(project)?.timezone);
    }
    Ok(DEFAULT_TIMEZONE)
}
