use chrono::{DateTime, Utc};
use tracing::info;

use crate::db::ApplicationStore;
use crate::error::StoreError;
use crate::models::{ApplicationStatus, ApplicationUpdate, Outcome};

/// Persists one job's outcome as a single update of its application record.
pub struct StatusRecorder<'a> {
    store: &'a dyn ApplicationStore,
    dry_run: bool,
}

impl<'a> StatusRecorder<'a> {
    pub fn new(store: &'a dyn ApplicationStore, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    pub fn record(&self, job_id: &str, outcome: &Outcome) -> Result<(), StoreError> {
        let update = update_for(job_id, outcome, Utc::now());
        if self.dry_run {
            info!(job_id, status = %update.status, notes = %update.notes, "dry run, not recording");
            return Ok(());
        }
        self.store.apply_update(&update)
    }
}

/// Failures go back to `unapplied` so the job is retried on a later run.
pub fn update_for(job_id: &str, outcome: &Outcome, now: DateTime<Utc>) -> ApplicationUpdate {
    let (status, applied_at, screenshot_path) = match outcome {
        Outcome::Applied { screenshot, .. } => (
            ApplicationStatus::Applied,
            Some(now.timestamp()),
            screenshot.as_ref().map(|p| p.display().to_string()),
        ),
        Outcome::Skipped { .. } => (ApplicationStatus::Skipped, None, None),
        Outcome::Failed { .. } => (ApplicationStatus::Unapplied, None, None),
    };

    ApplicationUpdate {
        job_id: job_id.to_string(),
        status,
        notes: outcome.notes(),
        platform: outcome.platform().map(|p| p.label().to_string()),
        applied_at,
        screenshot_path,
    }
}
