use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::platform::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub url: String,
    pub match_score: Option<f64>,
    pub platform: Option<String>, // last-known label from ingestion
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Unapplied,
    Applied,
    Failed,
    Skipped,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Unapplied => "unapplied",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Failed => "failed",
            ApplicationStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unapplied" => Ok(ApplicationStatus::Unapplied),
            "applied" => Ok(ApplicationStatus::Applied),
            "failed" => Ok(ApplicationStatus::Failed),
            "skipped" => Ok(ApplicationStatus::Skipped),
            other => Err(format!("unknown application status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub job_id: String,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub platform: Option<String>,
    pub applied_at: Option<DateTime<Utc>>,
    pub screenshot_path: Option<String>,
    pub updated_at: String,
}

/// What happened to one job during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied {
        platform: Platform,
        screenshot: Option<PathBuf>,
    },
    /// Declined at the confirmation gate.
    Skipped {
        reason: String,
        platform: Option<Platform>,
    },
    Failed {
        reason: String,
    },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Applied { .. } => OutcomeKind::Applied,
            Outcome::Skipped { .. } => OutcomeKind::Skipped,
            Outcome::Failed { .. } => OutcomeKind::Failed,
        }
    }

    pub fn platform(&self) -> Option<Platform> {
        match self {
            Outcome::Applied { platform, .. } => Some(*platform),
            Outcome::Skipped { platform, .. } => *platform,
            Outcome::Failed { .. } => None,
        }
    }

    /// Free-text context written to the record's `notes`.
    pub fn notes(&self) -> String {
        match self {
            Outcome::Applied { platform, .. } => format!("Applied via {}", platform),
            Outcome::Skipped { reason, .. } => reason.clone(),
            Outcome::Failed { reason } => format!("Error: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Applied,
    Skipped,
    Failed,
}

/// The single write the status recorder issues for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationUpdate {
    pub job_id: String,
    pub status: ApplicationStatus,
    pub notes: String,
    pub platform: Option<String>,
    /// `Some` only for transitions into `applied`; the store keeps an existing
    /// timestamp rather than overwriting it.
    pub applied_at: Option<i64>,
    pub screenshot_path: Option<String>,
}
