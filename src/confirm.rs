use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::models::JobPosting;
use crate::platform::Platform;

/// What the gate gets to look at before a submission.
pub struct ConfirmRequest<'a> {
    pub job: &'a JobPosting,
    pub platform: Platform,
    pub final_url: &'a str,
    pub fields_filled: usize,
    pub screenshot: Option<&'a Path>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Decline(String),
}

/// The one place a submission can be vetoed.
pub trait ConfirmationGate {
    fn confirm(&mut self, request: &ConfirmRequest) -> Result<Decision>;
}

/// Unattended mode.
pub struct AutoApprove;

impl ConfirmationGate for AutoApprove {
    fn confirm(&mut self, _request: &ConfirmRequest) -> Result<Decision> {
        Ok(Decision::Approve)
    }
}

/// Asks a yes/no question on a terminal. Anything but `y`/`yes` declines,
/// including end of input.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ConfirmationGate for TerminalPrompt<R, W> {
    fn confirm(&mut self, request: &ConfirmRequest) -> Result<Decision> {
        let job = request.job;
        writeln!(self.output)?;
        writeln!(self.output, "  {} - {}", job.company, job.title)?;
        writeln!(self.output, "  Platform: {}", request.platform)?;
        writeln!(self.output, "  Form URL: {}", request.final_url)?;
        writeln!(self.output, "  Fields filled: {}", request.fields_filled)?;
        if let Some(path) = request.screenshot {
            writeln!(self.output, "  Screenshot: {}", path.display())?;
        }
        write!(self.output, "  Submit this application? [y/N] ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Decision::Decline("No confirmation received".to_string()));
        }

        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(Decision::Approve),
            _ => Ok(Decision::Decline("User skipped".to_string())),
        }
    }
}

/// Pick the gate for a run: auto-approve when unattended, otherwise ask on
/// the controlling terminal.
pub fn gate_for(unattended: bool) -> Box<dyn ConfirmationGate> {
    if unattended {
        Box::new(AutoApprove)
    } else {
        Box::new(TerminalPrompt::new(io::stdin().lock(), io::stderr()))
    }
}
