//! Final run report.
//!
//! Built once when the run finalizes, whether the tick budget was met or the
//! run was cancelled, and handed read-only to the report sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::milestone::Milestone;
use crate::status::StatusTable;

/// Why the wait for ticks ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// No tick budget was set, so the run did not wait at all.
    Immediate,
    /// The observed tick reached the configured budget.
    BudgetReached,
    /// The run was interrupted before the budget was met.
    Cancelled,
}

/// Pass/fail result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Verdict {
    /// No required milestone failed.
    Passed,
    /// At least one required milestone missed its deadline.
    Failed {
        /// Descriptions of the failing milestones.
        milestones: Vec<String>,
    },
}

impl Verdict {
    /// Whether the run passed.
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Everything known about a run at the moment it finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// Wall-clock time the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock time the report was built.
    pub finished_at: DateTime<Utc>,
    /// Why the wait ended.
    pub end_reason: EndReason,
    /// Last tick observed from the feed.
    pub last_tick: u64,
    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u64,
    /// Final status table.
    pub status: StatusTable,
    /// Final milestone list with outcomes.
    pub milestones: Vec<Milestone>,
    /// Pass/fail verdict. Absent when the run was cancelled.
    pub verdict: Option<Verdict>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verdict_serializes_tagged() {
        let failed = Verdict::Failed {
            milestones: vec!["first creep".to_owned()],
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["result"], "failed");
        assert_eq!(json["milestones"][0], "first creep");

        let passed = serde_json::to_value(Verdict::Passed).unwrap();
        assert_eq!(passed["result"], "passed");
    }
}
