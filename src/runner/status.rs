use crate::models::CheckResult;
use serde::Serialize;
use std::fmt;

/// Per-unit status, derived from the unit's last result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum CheckStatus {
    /// Never checked
    #[default]
    Unevaluated,
    Good,
    Warning,
    Bad,
    /// The last check could not run (configuration error)
    Failed,
}

impl CheckStatus {
    /// `Good` when no results, otherwise `Warning` or `Bad` by the unit's warning flag
    pub fn derive(results: &[CheckResult], is_warning: bool) -> Self {
        if results.is_empty() {
            CheckStatus::Good
        } else if is_warning {
            CheckStatus::Warning
        } else {
            CheckStatus::Bad
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CheckStatus::Unevaluated => "unevaluated",
            CheckStatus::Good => "good",
            CheckStatus::Warning => "warning",
            CheckStatus::Bad => "bad",
            CheckStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Events emitted by the runner for front ends
#[derive(Clone, Debug, PartialEq)]
pub enum RunnerEvent {
    CheckStarted {
        name: String,
        objects: usize,
    },

    /// A check pass finished and the unit's status was re-derived
    StatusChanged {
        name: String,
        status: CheckStatus,
        defects: usize,
    },

    /// The check could not run at all
    CheckFailed {
        name: String,
        error: String,
    },

    FixApplied {
        name: String,
        targets: usize,
    },

    FixFailed {
        name: String,
        error: String,
    },
}

/// Tally of unit statuses after `run_all` or `fix_all`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub good: usize,
    pub warning: usize,
    pub bad: usize,
    pub failed: usize,
    /// Units not run (disabled, or nothing to fix)
    pub skipped: usize,
    /// One message per failed unit
    pub failures: Vec<String>,
}

impl RunSummary {
    pub fn record(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Good => self.good += 1,
            CheckStatus::Warning => self.warning += 1,
            CheckStatus::Bad => self.bad += 1,
            CheckStatus::Failed => self.failed += 1,
            CheckStatus::Unevaluated => self.skipped += 1,
        }
    }

    pub fn record_failure(&mut self, message: String) {
        self.failed += 1;
        self.failures.push(message);
    }

    /// No errors and no failed units (warnings allowed)
    pub fn is_clean(&self) -> bool {
        self.bad == 0 && self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} good, {} warning, {} bad, {} failed, {} skipped",
            self.good, self.warning, self.bad, self.failed, self.skipped
        )
    }
}

/// Outcome of [`super::CheckRunner::fix_until_converged`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvergenceReport {
    /// Fix rounds actually performed
    pub rounds: usize,
    /// Defective objects still reported by enabled fixable units
    pub remaining: usize,
    pub converged: bool,
    /// Stopped early because a fix round reduced none of the remaining defects
    pub stalled: bool,
    pub failures: Vec<String>,
}
