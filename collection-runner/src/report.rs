//! Run reports: console lines, the JSON report file and exit codes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::exit_codes;
use crate::sequencer::{Invocation, RunOutcome, RunStop};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub collection: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub all_passed: bool,
    pub exit_code: i32,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn new(collection: &Path, started_at: DateTime<Utc>, outcome: RunOutcome) -> Self {
        Self {
            collection: collection.display().to_string(),
            started_at,
            ended_at: Utc::now(),
            all_passed: outcome.all_passed(),
            exit_code: exit_code(&outcome),
            outcome,
        }
    }
}

/// Exit code for a finished run.
pub fn exit_code(outcome: &RunOutcome) -> i32 {
    match outcome.stop {
        RunStop::Halted { .. } | RunStop::UnknownStep { .. } => exit_codes::HALTED,
        RunStop::ExecutionLimit { .. } => exit_codes::EXECUTION_LIMIT,
        RunStop::Completed if outcome.all_passed() => exit_codes::OK,
        RunStop::Completed => exit_codes::FAILED,
    }
}

/// Console block for one invocation: a header and one line per ledger entry.
pub fn render_invocation(invocation: &Invocation) -> String {
    let mark = if invocation.passed() { "ok" } else { "FAIL" };
    let mut out = format!(
        "{} #{} [{}] {}\n",
        invocation.step, invocation.attempt, invocation.status, mark
    );
    for (name, value) in invocation.ledger.iter() {
        out.push_str(&format!("  {value} {name}\n"));
    }
    if let Some(error) = &invocation.error {
        out.push_str(&format!("  error: {error}\n"));
    }
    for line in &invocation.logs {
        out.push_str(&format!("  log: {line}\n"));
    }
    if let Some(next) = &invocation.next {
        out.push_str(&format!("  next: {next}\n"));
    }
    out
}

/// One-line summary of the run.
pub fn render_summary(outcome: &RunOutcome) -> String {
    let failed = outcome
        .invocations
        .iter()
        .filter(|invocation| !invocation.passed())
        .count();
    let stop = match &outcome.stop {
        RunStop::Completed => "completed".to_string(),
        RunStop::Halted { step } => format!("halted at '{step}'"),
        RunStop::UnknownStep { step, target } => {
            format!("halted: '{step}' jumped to unknown step '{target}'")
        }
        RunStop::ExecutionLimit { max_executions } => {
            format!("stopped after {max_executions} executions")
        }
    };
    format!(
        "{stop}: {} invocations, {failed} failed",
        outcome.invocations.len()
    )
}

/// Write the report as pretty JSON with a trailing newline.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(report).context("serialize run report")?;
    payload.push('\n');
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, payload).with_context(|| format!("write report {}", path.display()))
}
