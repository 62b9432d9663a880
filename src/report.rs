use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::batch::BatchRun;
use crate::models::OutcomeKind;

#[derive(Debug, Clone, Serialize)]
pub struct RunEntry {
    pub job_id: String,
    pub company: String,
    pub title: String,
    pub outcome: OutcomeKind,
    pub platform: Option<String>,
    pub detail: String,
    /// False when the outcome could not be written to the store.
    pub recorded: bool,
}

/// Summary of a finished run, also written as the JSON side artifact.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub elapsed_seconds: f64,
    pub dry_run: bool,
    pub selected: usize,
    pub processed: usize,
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
    pub remaining: usize,
    pub recording_errors: usize,
    pub jobs: Vec<RunEntry>,
    #[serde(skip)]
    pub artifact: Option<PathBuf>,
}

impl RunReport {
    pub fn from_run(run: BatchRun, dry_run: bool) -> Self {
        Self {
            started_at: run.started_at,
            finished_at: Local::now(),
            elapsed_seconds: run.elapsed().as_secs_f64(),
            dry_run,
            selected: run.selected,
            processed: run.processed,
            applied: run.applied,
            failed: run.failed,
            skipped: run.skipped,
            remaining: run.remaining,
            recording_errors: run.recording_errors,
            jobs: run.entries,
            artifact: None,
        }
    }

    pub fn success_rate(&self) -> Option<f64> {
        if self.processed == 0 {
            None
        } else {
            Some(self.applied as f64 / self.processed as f64 * 100.0)
        }
    }

    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create reports directory: {}", dir.display()))?;
        let path = dir.join(format!(
            "batch_apply_report_{}.json",
            self.started_at.format("%Y%m%d_%H%M%S")
        ));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(path)
    }

    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(80));
        println!("BATCH APPLY SUMMARY{}", if self.dry_run { " (dry run)" } else { "" });
        println!("{}", "=".repeat(80));
        println!("Started:   {}", self.started_at.format("%Y-%m-%d %H:%M:%S"));
        println!("Processed: {}", self.processed);
        println!("Applied:   {}", self.applied);
        println!("Failed:    {}", self.failed);
        println!("Skipped:   {}", self.skipped);
        match self.success_rate() {
            Some(rate) => println!("Success:   {:.1}%", rate),
            None => println!("Success:   N/A"),
        }
        if self.remaining > 0 {
            println!("Remaining: {} (run again to continue)", self.remaining);
        }
        if self.recording_errors > 0 {
            println!(
                "WARNING:   {} outcome(s) could not be saved; check these jobs before re-running",
                self.recording_errors
            );
        }
        println!("Elapsed:   {:.1}s", self.elapsed_seconds);

        let failed: Vec<&RunEntry> = self
            .jobs
            .iter()
            .filter(|e| e.outcome == OutcomeKind::Failed || !e.recorded)
            .collect();
        if !failed.is_empty() {
            println!("\nNeeds attention:");
            for entry in failed {
                println!(
                    "  #{} {} - {}: {}",
                    entry.job_id, entry.company, entry.title, entry.detail
                );
            }
        }
        println!("{}", "=".repeat(80));

        if let Some(path) = &self.artifact {
            println!("\nDetailed report saved to: {}", path.display());
        }
    }
}
