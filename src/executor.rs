use anyhow::{bail, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::confirm::{ConfirmRequest, ConfirmationGate, Decision};
use crate::error::AutomationError;
use crate::models::{JobPosting, Outcome};
use crate::platform::classify;
use crate::profile::ApplicantProfile;

// --- Automation backend trait ---

/// How to locate an element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Css(&'static str),
    XPath(&'static str),
}

/// Browser operations the apply protocol needs. Implementations own all
/// side effects on external sites.
pub trait AutomationBackend {
    fn navigate(&mut self, url: &str) -> Result<(), AutomationError>;

    /// Click the first target that resolves to an element.
    fn find_and_click(&mut self, targets: &[Target]) -> Result<(), AutomationError>;

    /// URL of the page the flow ended up on, after redirects or new windows.
    fn resolved_url(&mut self) -> Result<String, AutomationError>;

    /// Populate the visible form. Returns the number of fields filled.
    fn fill_form(&mut self, profile: &ApplicantProfile) -> Result<usize, AutomationError>;

    fn screenshot(&mut self, path: &Path) -> Result<(), AutomationError>;

    fn submit(&mut self) -> Result<(), AutomationError>;

    /// Return to a clean starting state (one window, nothing left over from
    /// the previous job). Runs after every attempt, successful or not.
    fn reset(&mut self) -> Result<(), AutomationError>;
}

pub const APPLY_TARGETS: &[Target] = &[
    Target::Css("button.jobs-apply-button"),
    Target::Css("a.jobs-apply-button"),
    Target::Css("button[aria-label*='Apply']"),
    Target::Css("a[aria-label*='Apply']"),
    Target::Css("a.postings-btn"),
    Target::Css("#apply_button"),
    Target::XPath("//button[contains(normalize-space(.), 'Apply')]"),
    Target::XPath("//a[contains(normalize-space(.), 'Apply')]"),
];

pub const SUBMIT_TARGETS: &[Target] = &[
    Target::Css("button[type='submit']"),
    Target::Css("input[type='submit']"),
    Target::Css("button[aria-label*='Submit']"),
    Target::XPath("//button[contains(normalize-space(.), 'Submit')]"),
];

/// Drives one job through the apply protocol and yields its outcome.
pub trait Applier {
    fn apply(&mut self, job: &JobPosting) -> Result<Outcome>;
}

pub struct ApplyExecutor<B: AutomationBackend> {
    backend: B,
    gate: Box<dyn ConfirmationGate>,
    profile: ApplicantProfile,
    screenshots_dir: Option<PathBuf>,
}

impl<B: AutomationBackend> ApplyExecutor<B> {
    pub fn new(backend: B, gate: Box<dyn ConfirmationGate>, profile: ApplicantProfile) -> Self {
        Self {
            backend,
            gate,
            profile,
            screenshots_dir: None,
        }
    }

    pub fn with_screenshots(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = Some(dir.into());
        self
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    // A missing screenshot never blocks an application.
    fn capture(&mut self, job: &JobPosting) -> Option<PathBuf> {
        let dir = self.screenshots_dir.as_ref()?;
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "cannot create screenshots directory");
            return None;
        }
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let path = dir.join(screenshot_name(&job.id, &stamp));
        match self.backend.screenshot(&path) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "pre-submit screenshot failed");
                None
            }
        }
    }
}

fn screenshot_name(job_id: &str, stamp: &str) -> String {
    let safe: String = job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("apply-{}-{}.png", safe, stamp)
}

impl<B: AutomationBackend> Applier for ApplyExecutor<B> {
    fn apply(&mut self, job: &JobPosting) -> Result<Outcome> {
        if job.url.trim().is_empty() {
            bail!("job {} has no apply URL", job.id);
        }

        let result = self.attempt(job);
        if let Err(e) = self.backend.reset() {
            warn!(job_id = %job.id, error = %e, "could not reset browser after job");
        }
        result
    }
}

impl<B: AutomationBackend> ApplyExecutor<B> {
    fn attempt(&mut self, job: &JobPosting) -> Result<Outcome> {
        debug!(job_id = %job.id, url = %job.url, "opening job page");
        self.backend.navigate(&job.url)?;
        self.backend.find_and_click(APPLY_TARGETS)?;

        // The posting usually lives on a job board; the form is wherever the
        // apply button sent us.
        let final_url = self.backend.resolved_url()?;
        let platform = classify(&final_url);
        info!(job_id = %job.id, %platform, url = %final_url, "platform detected");

        let filled = self.backend.fill_form(&self.profile)?;
        debug!(job_id = %job.id, filled, "form populated");

        let screenshot = self.capture(job);

        let request = ConfirmRequest {
            job,
            platform,
            final_url: &final_url,
            fields_filled: filled,
            screenshot: screenshot.as_deref(),
        };
        if let Decision::Decline(reason) = self.gate.confirm(&request)? {
            info!(job_id = %job.id, %reason, "application declined");
            return Ok(Outcome::Skipped {
                reason,
                platform: Some(platform),
            });
        }

        self.backend.submit()?;
        Ok(Outcome::Applied { platform, screenshot })
    }
}
