//! Configuration loaded from `config.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! `BATCH_APPLY_DB` takes precedence over the file for the database path.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::batch::BatchConfig;
use crate::db::Database;
use crate::profile::ApplicantProfile;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "Database::default_path")]
    pub database: PathBuf,

    /// Where run summaries are written.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Where pre-submission screenshots go.
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: PathBuf,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub profile: ApplicantProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    /// A title must contain one of these (case-insensitive) to be relevant.
    #[serde(default = "default_title_keywords")]
    pub title_keywords: Vec<String>,

    /// Company value that marks a posting whose employer was never resolved.
    #[serde(default = "default_unknown_company")]
    pub unknown_company: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub headless: bool,

    /// Chrome user-data dir holding a logged-in session.
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,

    /// Seconds to let a page settle after navigation or a click.
    #[serde(default = "default_settle_seconds")]
    pub settle_seconds: u64,
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "batch-apply")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_reports_dir() -> PathBuf {
    data_dir().join("reports")
}

fn default_screenshots_dir() -> PathBuf {
    data_dir().join("screenshots")
}

fn default_title_keywords() -> Vec<String> {
    ["Software Engineer", "Backend", "Full Stack", "AI", "Engineer"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_unknown_company() -> String {
    "Unknown".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_settle_seconds() -> u64 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Database::default_path(),
            reports_dir: default_reports_dir(),
            screenshots_dir: default_screenshots_dir(),
            batch: BatchConfig::default(),
            selection: SelectionConfig::default(),
            browser: BrowserConfig::default(),
            profile: ApplicantProfile::default(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            title_keywords: default_title_keywords(),
            unknown_company: default_unknown_company(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: false,
            profile_dir: None,
            settle_seconds: default_settle_seconds(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "batch-apply")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`. A missing
    /// default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(db) = std::env::var("BATCH_APPLY_DB")
            && !db.is_empty()
        {
            config.database = PathBuf::from(db);
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
