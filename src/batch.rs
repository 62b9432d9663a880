use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rand::Rng;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::db::ApplicationStore;
use crate::executor::Applier;
use crate::models::{JobPosting, Outcome, OutcomeKind};
use crate::recorder::StatusRecorder;
use crate::report::{RunEntry, RunReport};
use crate::selector::WorkSelector;

const PROGRESS_EVERY: usize = 5;

/// Pacing and policy knobs for one run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Pause after each job except the last.
    pub item_delay_seconds: u64,
    /// Up to this many extra seconds are added to each item delay.
    pub item_delay_jitter_seconds: u64,
    /// Take a cooldown on top of the item delay after every Nth job. 0 disables.
    pub cooldown_every_n_items: usize,
    pub cooldown_seconds: u64,
    /// Stop after this many jobs and report the rest as remaining.
    pub hard_cap: Option<usize>,
    pub unattended: bool,
    #[serde(skip)]
    pub dry_run: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            item_delay_seconds: 5,
            item_delay_jitter_seconds: 0,
            cooldown_every_n_items: 10,
            cooldown_seconds: 10,
            hard_cap: None,
            unattended: false,
            dry_run: false,
        }
    }
}

impl BatchConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_secs(self.item_delay_seconds)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    fn is_cooldown_point(&self, position: usize) -> bool {
        self.cooldown_every_n_items > 0 && position % self.cooldown_every_n_items == 0
    }
}

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the calling thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Processing,
    Recording,
    Resting,
    Reporting,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Fetching => "fetching",
            Phase::Processing => "processing",
            Phase::Recording => "recording",
            Phase::Resting => "resting",
            Phase::Reporting => "reporting",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// In-memory state of one run. Never persisted to the store.
#[derive(Debug)]
pub struct BatchRun {
    pub started_at: DateTime<Local>,
    started: Instant,
    pub selected: usize,
    pub entries: Vec<RunEntry>,
    pub processed: usize,
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
    pub recording_errors: usize,
    pub remaining: usize,
}

impl BatchRun {
    fn new() -> Self {
        Self {
            started_at: Local::now(),
            started: Instant::now(),
            selected: 0,
            entries: Vec::new(),
            processed: 0,
            applied: 0,
            failed: 0,
            skipped: 0,
            recording_errors: 0,
            remaining: 0,
        }
    }

    fn push(&mut self, job: &JobPosting, outcome: &Outcome, recorded: bool) {
        self.processed += 1;
        match outcome.kind() {
            OutcomeKind::Applied => self.applied += 1,
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
        self.entries.push(RunEntry {
            job_id: job.id.clone(),
            company: job.company.clone(),
            title: job.title.clone(),
            outcome: outcome.kind(),
            platform: outcome.platform().map(|p| p.label().to_string()),
            detail: outcome.notes(),
            recorded,
        });
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Jobs per minute so far.
    fn rate(&self) -> f64 {
        let minutes = self.elapsed().as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.processed as f64 / minutes
        } else {
            0.0
        }
    }
}

/// Runs one batch: select, then apply/record each job in order with pacing
/// in between, then report.
pub struct BatchController<'a> {
    config: &'a BatchConfig,
    store: &'a dyn ApplicationStore,
    selector: &'a WorkSelector,
    applier: &'a mut dyn Applier,
    sleeper: &'a mut dyn Sleeper,
    reports_dir: Option<PathBuf>,
    phase: Phase,
}

impl<'a> BatchController<'a> {
    pub fn new(
        config: &'a BatchConfig,
        store: &'a dyn ApplicationStore,
        selector: &'a WorkSelector,
        applier: &'a mut dyn Applier,
        sleeper: &'a mut dyn Sleeper,
    ) -> Self {
        Self {
            config,
            store,
            selector,
            applier,
            sleeper,
            reports_dir: None,
            phase: Phase::Idle,
        }
    }

    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(dir.into());
        self
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
    }

    /// Only a selection failure is an error; everything that goes wrong with
    /// an individual job ends up in the report.
    pub fn run(&mut self, limit: Option<usize>) -> Result<RunReport> {
        let mut run = BatchRun::new();

        self.enter(Phase::Fetching);
        let jobs = self
            .selector
            .select(self.store, limit)
            .context("Failed to load eligible jobs")?;

        let to_process = match self.config.hard_cap {
            Some(cap) => cap.min(jobs.len()),
            None => jobs.len(),
        };
        run.selected = jobs.len();
        run.remaining = jobs.len() - to_process;
        info!(selected = jobs.len(), to_process, "work queue loaded");

        let recorder = StatusRecorder::new(self.store, self.config.dry_run);

        for (index, job) in jobs.iter().take(to_process).enumerate() {
            let position = index + 1;

            self.enter(Phase::Processing);
            info!(
                "[{}/{}] {} - {} ({})",
                position, to_process, job.company, job.title, job.url
            );
            let outcome = match self.applier.apply(job) {
                Ok(outcome) => outcome,
                Err(e) => Outcome::Failed {
                    reason: format!("{:#}", e),
                },
            };
            match &outcome {
                Outcome::Applied { platform, .. } => info!(job_id = %job.id, %platform, "applied"),
                Outcome::Skipped { reason, .. } => info!(job_id = %job.id, %reason, "skipped"),
                Outcome::Failed { reason } => warn!(job_id = %job.id, %reason, "apply failed"),
            }

            self.enter(Phase::Recording);
            let recorded = match recorder.record(&job.id, &outcome) {
                Ok(()) => true,
                Err(e) => {
                    run.recording_errors += 1;
                    if outcome.kind() == OutcomeKind::Applied {
                        error!(
                            critical = true,
                            job_id = %job.id,
                            error = %e,
                            "application submitted but status not saved; \
                             job may be applied to again on the next run"
                        );
                    } else {
                        error!(job_id = %job.id, error = %e, "failed to record outcome");
                    }
                    false
                }
            };
            run.push(job, &outcome, recorded);

            if run.processed % PROGRESS_EVERY == 0 {
                info!(
                    "progress: {} processed, {} applied, {:.1} jobs/min",
                    run.processed,
                    run.applied,
                    run.rate()
                );
            }

            if position < to_process {
                self.rest(position);
            }
        }

        if run.remaining > 0 {
            warn!(
                "stopped after {} jobs (hard cap); {} eligible jobs remain for the next run",
                to_process, run.remaining
            );
        }

        self.enter(Phase::Reporting);
        let mut report = RunReport::from_run(run, self.config.dry_run);
        if let Some(dir) = &self.reports_dir {
            match report.write_to(dir) {
                Ok(path) => report.artifact = Some(path),
                Err(e) => warn!(error = %format!("{:#}", e), "could not write run report"),
            }
        }

        self.enter(Phase::Done);
        Ok(report)
    }

    // The item delay always runs; a cooldown point adds its break on top.
    fn rest(&mut self, position: usize) {
        self.enter(Phase::Resting);

        let mut delay = self.config.item_delay();
        if self.config.item_delay_jitter_seconds > 0 {
            let extra = rand::thread_rng().gen_range(0..=self.config.item_delay_jitter_seconds);
            delay += Duration::from_secs(extra);
        }
        debug!("waiting {}s before next job", delay.as_secs());
        self.sleeper.sleep(delay);

        if self.config.is_cooldown_point(position) {
            info!("cooldown after {} jobs ({}s)", position, self.config.cooldown_seconds);
            self.sleeper.sleep(self.config.cooldown());
        }
    }
}
