//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use codestash_backup::{BackupEngine, TimeResolver, TimeSource};
use codestash_core::{BackupProfileConfig, ProjectConfig, SearchSetConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// 2024-03-20 23:45 in Tehran, the first minute of 1403-01-01 23:45 Jalali.
pub const FIXED_INSTANT: (i32, u32, u32, u32, u32) = (2024, 3, 20, 20, 15);
pub const BACKUP_DIR: &str = "Backup-1403-01-01_23-45";
pub const FILE_STAMP: &str = "20240320_2345";

/// Time source answering with a fixed instant.
pub struct FixedClock;

#[async_trait]
impl TimeSource for FixedClock {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch(&self, tz: Tz) -> anyhow::Result<DateTime<Tz>> {
        let (y, mo, d, h, mi) = FIXED_INSTANT;
        let utc = Utc
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("invalid instant"))?;
        Ok(utc.with_timezone(&tz))
    }
}

/// A small monorepo with API and web areas plus ignorable noise.
pub struct ProjectFixture {
    pub project: TempDir,
    pub out: TempDir,
}

impl ProjectFixture {
    pub fn new() -> Self {
        let fixture = Self {
            project: TempDir::new().unwrap(),
            out: TempDir::new().unwrap(),
        };
        fixture.write("package.json", "{\"name\": \"web\"}\n");
        fixture.write("tsconfig.json", "{\"compilerOptions\": {}}\n");
        fixture.write(
            "apps/api/src/users/users.service.ts",
            "export class UsersService {\n  sign() { return jwt.sign({}); }\n}\n",
        );
        fixture.write(
            "apps/api/src/users/users.controller.ts",
            "export class UsersController {}\n",
        );
        fixture.write("apps/site/src/app.tsx", "export const App = () => null;\n");
        fixture.write("apps/site/src/app.spec.tsx", "it('renders', () => {});\n");
        fixture.write("node_modules/left-pad/index.js", "module.exports = 1;\n");
        fixture
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.project.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn backup_root(&self) -> PathBuf {
        self.out.path().join("backups")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.out.path().join("archives")
    }

    pub fn project_config(&self) -> ProjectConfig {
        let mut project = ProjectConfig::new(
            "web",
            self.project.path().to_path_buf(),
            self.backup_root(),
        );
        project.archive_output_dir = self.archive_dir();
        project
    }

    pub fn engine(&self, profile: BackupProfileConfig) -> BackupEngine {
        BackupEngine::new(self.project_config(), profile)
            .with_search_sets(vec![SearchSetConfig::new("auth", vec!["jwt".to_string()])])
            .with_time_resolver(TimeResolver::with_sources(vec![Arc::new(FixedClock)]))
    }
}

/// Artifact path under the default dynamic name template.
pub fn artifact(backup_dir: &Path, base: &str, ext: &str) -> PathBuf {
    backup_dir.join(format!("web_{}_{}{}", base, FILE_STAMP, ext))
}
