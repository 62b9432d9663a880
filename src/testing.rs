//! Test doubles shared by the unit tests: an in-memory store, a simulated
//! browser, scripted appliers and gates, and a sleeper that only records.

use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use crate::batch::Sleeper;
use crate::confirm::{ConfirmRequest, ConfirmationGate, Decision};
use crate::db::ApplicationStore;
use crate::error::{AutomationError, StoreError};
use crate::executor::{Applier, AutomationBackend, Target};
use crate::models::{ApplicationStatus, ApplicationUpdate, JobPosting, Outcome};
use crate::platform::{classify, Platform};
use crate::profile::ApplicantProfile;

pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn posting(id: &str, title: &str, company: &str, url: &str, score: Option<f64>) -> JobPosting {
    JobPosting {
        id: id.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        location: Some("Remote".to_string()),
        url: url.to_string(),
        match_score: score,
        platform: Some("linkedin".to_string()),
    }
}

// --- In-memory store ---

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    pub platform: Option<String>,
    pub applied_at: Option<i64>,
    pub screenshot_path: Option<String>,
}

/// Mirrors the SQLite store's update rules. Hands postings back in insertion
/// order so callers cannot rely on the store for ordering.
pub struct MemoryStore {
    jobs: Vec<JobPosting>,
    records: RefCell<HashMap<String, StoredRecord>>,
    updates: RefCell<Vec<ApplicationUpdate>>,
    fail_reads: Cell<bool>,
    failing_writes: RefCell<HashSet<String>>,
    log: Option<EventLog>,
}

impl MemoryStore {
    pub fn new(jobs: Vec<JobPosting>) -> Self {
        let records = jobs
            .iter()
            .map(|job| {
                (
                    job.id.clone(),
                    StoredRecord {
                        status: ApplicationStatus::Unapplied,
                        notes: None,
                        platform: None,
                        applied_at: None,
                        screenshot_path: None,
                    },
                )
            })
            .collect();
        Self {
            jobs,
            records: RefCell::new(records),
            updates: RefCell::new(Vec::new()),
            fail_reads: Cell::new(false),
            failing_writes: RefCell::new(HashSet::new()),
            log: None,
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn set_status(&self, job_id: &str, status: ApplicationStatus) {
        if let Some(record) = self.records.borrow_mut().get_mut(job_id) {
            record.status = status;
        }
    }

    pub fn status(&self, job_id: &str) -> Option<ApplicationStatus> {
        self.record(job_id).map(|r| r.status)
    }

    pub fn record(&self, job_id: &str) -> Option<StoredRecord> {
        self.records.borrow().get(job_id).cloned()
    }

    pub fn updates(&self) -> Vec<ApplicationUpdate> {
        self.updates.borrow().clone()
    }

    pub fn fail_reads(&self) {
        self.fail_reads.set(true);
    }

    pub fn fail_writes_for(&self, job_id: &str) {
        self.failing_writes.borrow_mut().insert(job_id.to_string());
    }
}

impl ApplicationStore for MemoryStore {
    fn unapplied_postings(&self) -> Result<Vec<JobPosting>, StoreError> {
        if self.fail_reads.get() {
            return Err(StoreError::Io(std::io::Error::other("store unreachable")));
        }
        let records = self.records.borrow();
        Ok(self
            .jobs
            .iter()
            .filter(|job| {
                records
                    .get(&job.id)
                    .is_some_and(|r| r.status == ApplicationStatus::Unapplied)
            })
            .cloned()
            .collect())
    }

    fn apply_update(&self, update: &ApplicationUpdate) -> Result<(), StoreError> {
        if let Some(log) = &self.log {
            log.borrow_mut().push(format!("record {}", update.job_id));
        }
        if self.failing_writes.borrow().contains(&update.job_id) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        let mut records = self.records.borrow_mut();
        let record = records
            .get_mut(&update.job_id)
            .ok_or_else(|| StoreError::MissingRecord(update.job_id.clone()))?;

        let keep_timestamp = update.applied_at.is_some()
            && record.status == ApplicationStatus::Applied
            && record.applied_at.is_some();
        if !keep_timestamp {
            record.applied_at = update.applied_at;
        }
        record.status = update.status;
        record.notes = Some(update.notes.clone());
        if update.platform.is_some() {
            record.platform = update.platform.clone();
        }
        if update.screenshot_path.is_some() {
            record.screenshot_path = update.screenshot_path.clone();
        }
        self.updates.borrow_mut().push(update.clone());
        Ok(())
    }
}

// --- Simulated browser ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Navigate,
    Click,
    Fill,
    Screenshot,
    Submit,
    Reset,
}

/// Stands in for a real browser: records each call and follows scripted
/// redirects, each of which opens a new window. Fails a step when the
/// current URL contains a configured fragment.
#[derive(Default)]
pub struct SimulatedBackend {
    pub calls: Vec<String>,
    current_url: String,
    redirects: HashMap<String, String>,
    failures: Vec<(String, Step)>,
    extra_windows: usize,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn fail_at(mut self, url_fragment: &str, step: Step) -> Self {
        self.failures.push((url_fragment.to_string(), step));
        self
    }

    pub fn open_windows(&self) -> usize {
        1 + self.extra_windows
    }

    fn should_fail(&self, step: Step) -> bool {
        self.failures
            .iter()
            .any(|(fragment, s)| *s == step && self.current_url.contains(fragment.as_str()))
    }
}

impl AutomationBackend for SimulatedBackend {
    fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        self.calls.push(format!("navigate {}", url));
        self.current_url = url.to_string();
        if self.should_fail(Step::Navigate) {
            return Err(AutomationError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        Ok(())
    }

    fn find_and_click(&mut self, targets: &[Target]) -> Result<(), AutomationError> {
        self.calls.push("click".to_string());
        if self.should_fail(Step::Click) {
            return Err(AutomationError::ElementNotFound(format!("{:?}", targets.first())));
        }
        if let Some(to) = self.redirects.get(&self.current_url) {
            self.current_url = to.clone();
            self.extra_windows += 1;
        }
        Ok(())
    }

    fn resolved_url(&mut self) -> Result<String, AutomationError> {
        self.calls.push("resolve".to_string());
        Ok(self.current_url.clone())
    }

    fn fill_form(&mut self, _profile: &ApplicantProfile) -> Result<usize, AutomationError> {
        self.calls.push("fill".to_string());
        if self.should_fail(Step::Fill) {
            return Err(AutomationError::FormFill("resume upload rejected".to_string()));
        }
        Ok(3)
    }

    fn screenshot(&mut self, _path: &Path) -> Result<(), AutomationError> {
        self.calls.push("screenshot".to_string());
        if self.should_fail(Step::Screenshot) {
            return Err(AutomationError::Screenshot("no page".to_string()));
        }
        Ok(())
    }

    fn submit(&mut self) -> Result<(), AutomationError> {
        self.calls.push("submit".to_string());
        if self.should_fail(Step::Submit) {
            return Err(AutomationError::Submit("button disabled".to_string()));
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), AutomationError> {
        self.calls.push("reset".to_string());
        if self.should_fail(Step::Reset) {
            return Err(AutomationError::Session("window already closed".to_string()));
        }
        self.extra_windows = 0;
        self.current_url.clear();
        Ok(())
    }
}

// --- Scripted collaborators ---

pub struct ScriptedGate {
    decision: Decision,
}

impl ScriptedGate {
    pub fn declining(reason: &str) -> Self {
        Self {
            decision: Decision::Decline(reason.to_string()),
        }
    }
}

impl ConfirmationGate for ScriptedGate {
    fn confirm(&mut self, _request: &ConfirmRequest) -> Result<Decision> {
        Ok(self.decision.clone())
    }
}

enum Script {
    Outcome(Outcome),
    Error(String),
}

/// Applier that answers from a script keyed by job id; unscripted jobs are
/// applied on the platform their URL points at.
pub struct ScriptedApplier {
    script: HashMap<String, Script>,
    log: EventLog,
}

impl ScriptedApplier {
    pub fn new(log: EventLog) -> Self {
        Self {
            script: HashMap::new(),
            log,
        }
    }

    pub fn outcome(mut self, job_id: &str, outcome: Outcome) -> Self {
        self.script.insert(job_id.to_string(), Script::Outcome(outcome));
        self
    }

    pub fn error(mut self, job_id: &str, message: &str) -> Self {
        self.script.insert(job_id.to_string(), Script::Error(message.to_string()));
        self
    }
}

impl Applier for ScriptedApplier {
    fn apply(&mut self, job: &JobPosting) -> Result<Outcome> {
        self.log.borrow_mut().push(format!("apply {}", job.id));
        match self.script.get(&job.id) {
            Some(Script::Outcome(outcome)) => Ok(outcome.clone()),
            Some(Script::Error(message)) => Err(anyhow!(message.clone())),
            None => Ok(Outcome::Applied {
                platform: classify(&job.url),
                screenshot: None,
            }),
        }
    }
}

pub struct RecordingSleeper {
    log: EventLog,
    pub sleeps: Vec<Duration>,
}

impl RecordingSleeper {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            sleeps: Vec::new(),
        }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.log.borrow_mut().push(format!("sleep {}", duration.as_secs()));
        self.sleeps.push(duration);
    }
}

pub fn skipped(reason: &str) -> Outcome {
    Outcome::Skipped {
        reason: reason.to_string(),
        platform: Some(Platform::Generic),
    }
}
