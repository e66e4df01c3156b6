//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

// Re-export command types for convenience
pub use crate::commands::backup::BackupArgs;
pub use crate::commands::bundle::BundleArgs;

/// codestash - readable snapshots of a source tree
#[derive(Parser, Debug)]
#[command(name = "codestash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to codestash.json (searched upwards from the current directory by default)
    #[arg(short, long, global = true, env = "CODESTASH_CONFIG")]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Back up a configured project
    Backup(BackupArgs),

    /// Bundle an arbitrary source tree into one or more files
    Bundle(BundleArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Resolve the current time the way a backup would
    Time(TimeArgs),
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate the configuration file
    Validate,

    /// Show projects, profiles and search sets
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Time command
#[derive(Args, Debug)]
pub struct TimeArgs {
    /// IANA timezone; defaults to the project's zone, then Asia/Tehran
    #[arg(long)]
    pub timezone: Option<String>,

    /// Take the timezone from this configured project
    #[arg(short, long)]
    pub project: Option<String>,

    /// Use the system clock only
    #[arg(long)]
    pub offline: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
