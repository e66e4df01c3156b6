//! codestash backup engine
//!
//! This crate turns a project described by `codestash-core` configuration
//! into a timestamped backup directory of human-readable bundles, optionally
//! archived as zip or tar.gz.
//!
//! # Features
//!
//! - **Step pipeline**: trees, code bundles, config bundles, API groups,
//!   path listings, keyword search and project-root helpers, each
//!   independently enabled per profile
//! - **Dry runs**: the full phase sequence with intent logging and no writes
//! - **Cooperative cancellation**: checked between phases and per file
//! - **Network time**: prioritized HTTP sources with system-clock fallback
//! - **Jalali stamps**: backup directories named by the Solar Hijri calendar
//! - **Universal bundles**: ad-hoc bundling of any source tree by extension
//!
//! # Examples
//!
//! ```no_run
//! use codestash_backup::{BackupEngine, RunOptions};
//! use codestash_core::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let project = config.project("web")?.clone();
//!     let profile = config.profile("standard")?.clone();
//!
//!     let engine = BackupEngine::new(project, profile)
//!         .with_search_sets(config.search_sets.clone());
//!
//!     match engine.run(RunOptions::default()).await {
//!         Ok(result) => println!("Backup written to {:?}", result.backup_root_path),
//!         Err(failure) => eprintln!("Backup failed: {}", failure),
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod jalali;
pub mod logger;
pub mod naming;
pub mod output;
pub mod progress;
pub mod reader;
pub mod scanning;
pub mod steps;
pub mod time;
pub mod universal;

// Re-export commonly used types
pub use archive::{calculate_checksum, ArchiveBuilder, ArchiveConfig, ArchiveResult};
pub use cancel::CancelToken;
pub use engine::{BackupEngine, BackupResult, RunOptions, RunStatus, ARCHIVE_STATS_KEY};
pub use error::{BackupError, BackupFailure, Result};
pub use jalali::{format_jalali_datetime, format_jalali_stamp, gregorian_to_jalali, JalaliDate};
pub use logger::{LogCallback, ProgressCallback, RunLogger};
pub use naming::NameBuilder;
pub use progress::{PhaseProgress, SpinnerProgress};
pub use steps::StepStats;
pub use time::{TimeResolver, TimeResult, TimeSource, SYSTEM_SOURCE};
pub use universal::{
    run_universal_backup, BackupFileInfo, UniversalBackupConfig, UniversalBackupStats,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
