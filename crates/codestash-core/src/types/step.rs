//! Backup step identifiers

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One independently enable/disable-able unit of backup work.
///
/// Variants are declared in execution order; `BackupStep::ALL` preserves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStep {
    /// Compressed indentation trees of each area and the whole project
    Trees,
    /// Full-text code bundles per area plus one whole-project bundle
    CodeTxt,
    /// Markdown bundles of primary-language files per area
    TsTsxMdBundles,
    /// Single markdown bundle of every primary-language file
    FullTsTsxBundle,
    /// Bundle of known configuration manifests
    Configs,
    /// Bundle of compiler configuration files at fixed paths
    TsconfigBundle,
    /// API files grouped by structural suffix
    ApiGroupBundles,
    /// Path listings
    Paths,
    /// Keyword search bundles, one per search set
    KeywordSearch,
    /// Tree.md and AllCode_Backup.md helper files
    ProjectRootFiles,
}

impl BackupStep {
    /// Every step in execution order.
    pub const ALL: [BackupStep; 10] = [
        BackupStep::Trees,
        BackupStep::CodeTxt,
        BackupStep::TsTsxMdBundles,
        BackupStep::FullTsTsxBundle,
        BackupStep::Configs,
        BackupStep::TsconfigBundle,
        BackupStep::ApiGroupBundles,
        BackupStep::Paths,
        BackupStep::KeywordSearch,
        BackupStep::ProjectRootFiles,
    ];

    /// Steps enabled when a profile does not list its own.
    pub fn defaults() -> Vec<BackupStep> {
        Self::ALL
            .into_iter()
            .filter(|step| *step != BackupStep::ProjectRootFiles)
            .collect()
    }

    /// Configuration name of the step.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStep::Trees => "trees",
            BackupStep::CodeTxt => "code_txt",
            BackupStep::TsTsxMdBundles => "ts_tsx_md_bundles",
            BackupStep::FullTsTsxBundle => "full_ts_tsx_bundle",
            BackupStep::Configs => "configs",
            BackupStep::TsconfigBundle => "tsconfig_bundle",
            BackupStep::ApiGroupBundles => "api_group_bundles",
            BackupStep::Paths => "paths",
            BackupStep::KeywordSearch => "keyword_search",
            BackupStep::ProjectRootFiles => "project_root_files",
        }
    }

    /// Human-readable phase label used for progress reporting.
    pub fn label(&self) -> &'static str {
        match self {
            BackupStep::Trees => "Directory trees",
            BackupStep::CodeTxt => "Code text bundles",
            BackupStep::TsTsxMdBundles => "TS/TSX markdown bundles",
            BackupStep::FullTsTsxBundle => "Full TS/TSX bundle",
            BackupStep::Configs => "Config bundles",
            BackupStep::TsconfigBundle => "TSConfig bundle",
            BackupStep::ApiGroupBundles => "API grouped bundles",
            BackupStep::Paths => "Path listings",
            BackupStep::KeywordSearch => "Keyword search bundles",
            BackupStep::ProjectRootFiles => "Project root helpers",
        }
    }

    /// Parses a step from its configuration name.
    pub fn parse(name: &str) -> Option<BackupStep> {
        Self::ALL.into_iter().find(|step| step.as_str() == name)
    }
}

impl FromStr for BackupStep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BackupStep::parse(s).ok_or_else(|| Error::unknown_step(s))
    }
}

impl fmt::Display for BackupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
