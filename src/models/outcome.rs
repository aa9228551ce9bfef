//! Run outcome models
//!
//! What a single run produced, and a summary over many runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Finished without an exception
    Pass,
    /// Became ready, then failed
    Fail,
    /// Failed before ever becoming ready
    Error,
}

impl RunStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            RunStatus::Pass => "✓",
            RunStatus::Fail => "✗",
            RunStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Pass)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pass => write!(f, "PASS"),
            RunStatus::Fail => write!(f, "FAIL"),
            RunStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of driving one launch request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Outcome {
    pub test_id: String,
    pub status: RunStatus,
    /// Whether `ready` was emitted
    pub ready: bool,
    pub exception: Option<String>,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl Outcome {
    /// Classify from what the controller observed
    pub fn from_parts(
        test_id: impl Into<String>,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        ready: bool,
        exception: Option<String>,
    ) -> Self {
        let status = match (&exception, ready) {
            (None, _) => RunStatus::Pass,
            (Some(_), true) => RunStatus::Fail,
            (Some(_), false) => RunStatus::Error,
        };
        Self {
            test_id: test_id.into(),
            status,
            ready,
            exception,
            duration_ms,
            started_at,
        }
    }

    pub fn pass(test_id: impl Into<String>, started_at: DateTime<Utc>, duration_ms: u64) -> Self {
        Self::from_parts(test_id, started_at, duration_ms, true, None)
    }

    pub fn fail(
        test_id: impl Into<String>,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        exception: impl Into<String>,
    ) -> Self {
        Self::from_parts(test_id, started_at, duration_ms, true, Some(exception.into()))
    }

    pub fn error(
        test_id: impl Into<String>,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        exception: impl Into<String>,
    ) -> Self {
        Self::from_parts(test_id, started_at, duration_ms, false, Some(exception.into()))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.test_id,
            self.duration_ms
        )?;
        if let Some(exception) = &self.exception {
            write!(f, " - {exception}")?;
        }
        Ok(())
    }
}

/// Summary over a batch of runs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub total_duration_ms: u64,
    pub outcomes: Vec<Outcome>,
}

impl BatchSummary {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        let count = |status: RunStatus| outcomes.iter().filter(|o| o.status == status).count();
        let passed = count(RunStatus::Pass);
        let failed = count(RunStatus::Fail);
        let errors = count(RunStatus::Error);

        Self {
            total: outcomes.len(),
            passed,
            failed,
            errors,
            total_duration_ms: outcomes.iter().map(|o| o.duration_ms).sum(),
            outcomes,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.passed == self.total
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for outcome in &self.outcomes {
            writeln!(f, "  {outcome}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Error: {}",
            self.total, self.passed, self.failed, self.errors
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}
