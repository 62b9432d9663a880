use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::{ChromiumLikeCapabilities, WindowHandle};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::error::AutomationError;
use crate::executor::{AutomationBackend, Target, SUBMIT_TARGETS};
use crate::profile::ApplicantProfile;

const FORM_FIELDS: &str = concat!(
    "input:not([type='hidden']):not([type='submit']):not([type='button'])",
    ":not([type='checkbox']):not([type='radio']), textarea"
);

/// Drives Chrome through a WebDriver server (chromedriver, selenium).
///
/// The client is async; calls are run to completion on a current-thread
/// runtime so the batch stays strictly sequential. The session is opened on
/// first use, so a run with nothing to do never needs a browser.
pub struct WebDriverBackend {
    runtime: Runtime,
    config: BrowserConfig,
    session: Option<Session>,
    /// Window handles open before the current job's apply click.
    known_windows: Vec<WindowHandle>,
}

struct Session {
    driver: WebDriver,
    /// The window the session started in; every job begins and ends there.
    home: WindowHandle,
}

fn session_error(e: impl std::fmt::Display) -> AutomationError {
    AutomationError::Session(e.to_string())
}

impl WebDriverBackend {
    pub fn new(config: BrowserConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime for the browser client")?;
        Ok(Self {
            runtime,
            config,
            session: None,
            known_windows: Vec::new(),
        })
    }

    fn session(&mut self) -> Result<(&Runtime, &WebDriver), AutomationError> {
        if self.session.is_none() {
            info!(url = %self.config.webdriver_url, "connecting to WebDriver");
            let session = self
                .runtime
                .block_on(connect(&self.config))
                .map_err(session_error)?;
            self.session = Some(session);
        }
        match &self.session {
            Some(session) => Ok((&self.runtime, &session.driver)),
            None => Err(AutomationError::Session("no browser session".to_string())),
        }
    }

    fn settle(&self) -> Duration {
        Duration::from_secs(self.config.settle_seconds)
    }

    fn click_first(&mut self, targets: &[Target]) -> Result<(), AutomationError> {
        let settle = self.settle();
        let (runtime, driver) = self.session()?;
        runtime.block_on(async {
            for target in targets {
                let Ok(element) = driver.find(by(*target)).await else {
                    continue;
                };
                if element.click().await.is_ok() {
                    debug!(?target, "clicked");
                    tokio::time::sleep(settle).await;
                    return Ok(());
                }
            }
            Err(AutomationError::ElementNotFound(format!(
                "none of {} candidate elements could be clicked",
                targets.len()
            )))
        })
    }

    pub fn close(mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            self.runtime
                .block_on(session.driver.quit())
                .context("Failed to close browser session")?;
        }
        Ok(())
    }
}

async fn connect(config: &BrowserConfig) -> WebDriverResult<Session> {
    let mut caps = DesiredCapabilities::chrome();
    if config.headless {
        caps.set_headless()?;
    }
    // Reuse a logged-in profile so job boards don't bounce us to a login page
    if let Some(dir) = &config.profile_dir {
        caps.add_arg(&format!("--user-data-dir={}", dir.display()))?;
    }
    let driver = WebDriver::new(config.webdriver_url.as_str(), caps).await?;
    let home = driver.window().await?;
    Ok(Session { driver, home })
}

fn by(target: Target) -> By {
    match target {
        Target::Css(selector) => By::Css(selector),
        Target::XPath(path) => By::XPath(path),
    }
}

/// Label text for a form element: the first of these attributes that is set.
async fn field_label(element: &WebElement) -> String {
    for attr in ["aria-label", "name", "id", "placeholder", "autocomplete"] {
        if let Ok(Some(value)) = element.attr(attr).await {
            if !value.trim().is_empty() {
                return value;
            }
        }
    }
    String::new()
}

impl AutomationBackend for WebDriverBackend {
    fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        let settle = self.settle();
        let (runtime, driver) = self.session()?;
        let windows = runtime.block_on(async {
            driver.goto(url).await.map_err(|e| AutomationError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            tokio::time::sleep(settle).await;
            driver.windows().await.map_err(session_error)
        })?;
        self.known_windows = windows;
        Ok(())
    }

    fn find_and_click(&mut self, targets: &[Target]) -> Result<(), AutomationError> {
        self.click_first(targets)
    }

    fn resolved_url(&mut self) -> Result<String, AutomationError> {
        let known = self.known_windows.clone();
        let (runtime, driver) = self.session()?;
        runtime.block_on(async {
            // Apply buttons on job boards often open the ATS in a new tab.
            // Handle order is unspecified, so look for the one we haven't seen.
            let windows = driver.windows().await.map_err(session_error)?;
            let opened: Vec<WindowHandle> =
                windows.into_iter().filter(|h| !known.contains(h)).collect();
            if opened.len() > 1 {
                warn!(count = opened.len(), "apply click opened several windows");
            }
            if let Some(handle) = opened.into_iter().next() {
                driver.switch_to_window(handle).await.map_err(session_error)?;
            }
            let url = driver.current_url().await.map_err(session_error)?;
            Ok(url.to_string())
        })
    }

    fn fill_form(&mut self, profile: &ApplicantProfile) -> Result<usize, AutomationError> {
        let (runtime, driver) = self.session()?;
        runtime.block_on(async {
            let fields = driver
                .find_all(By::Css(FORM_FIELDS))
                .await
                .map_err(|e| AutomationError::FormFill(e.to_string()))?;

            let mut filled = 0;
            for field in fields {
                let kind = field.attr("type").await.ok().flatten().unwrap_or_default();
                if kind == "file" {
                    if let Some(resume) = &profile.resume_path {
                        field
                            .send_keys(resume.display().to_string())
                            .await
                            .map_err(|e| {
                                AutomationError::FormFill(format!("resume upload: {}", e))
                            })?;
                        filled += 1;
                    }
                    continue;
                }

                let label = field_label(&field).await;
                let Some(value) = profile.value_for_label(&label) else {
                    continue;
                };
                // Hidden or disabled fields refuse input; that is not a failure.
                if !field.is_displayed().await.unwrap_or(false) {
                    continue;
                }
                if let Err(e) = field.clear().await {
                    debug!(field = %label, error = %e, "could not clear field before typing");
                }
                field
                    .send_keys(value)
                    .await
                    .map_err(|e| AutomationError::FormFill(format!("{}: {}", label, e)))?;
                filled += 1;
            }
            Ok(filled)
        })
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), AutomationError> {
        let (runtime, driver) = self.session()?;
        runtime
            .block_on(driver.screenshot(path))
            .map_err(|e| AutomationError::Screenshot(e.to_string()))
    }

    fn submit(&mut self) -> Result<(), AutomationError> {
        self.click_first(SUBMIT_TARGETS)
            .map_err(|e| AutomationError::Submit(e.to_string()))
    }

    fn reset(&mut self) -> Result<(), AutomationError> {
        self.known_windows.clear();
        // Nothing to clean up if the browser was never opened
        let Some(session) = &self.session else {
            return Ok(());
        };
        let driver = &session.driver;
        let home = session.home.clone();
        self.runtime.block_on(async {
            let windows = driver.windows().await.map_err(session_error)?;
            for handle in windows.into_iter().filter(|h| *h != home) {
                debug!(?handle, "closing leftover window");
                driver.switch_to_window(handle).await.map_err(session_error)?;
                driver.close_window().await.map_err(session_error)?;
            }
            driver.switch_to_window(home).await.map_err(session_error)
        })
    }
}
