// SPDX-License-Identifier: MIT

//! ScoutRun / ScoutSchedule — recurring external-source ingestion
//! (spec.md §3, §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a scout run.
    pub struct ScoutRunId;
}

crate::define_id! {
    /// Unique identifier for a scout schedule.
    pub struct ScoutScheduleId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Scheduled,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoutRunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    ScoutRunStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl ScoutRunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScoutRunStatus::Completed | ScoutRunStatus::Failed | ScoutRunStatus::Cancelled)
    }
}

/// A single triggered ingestion run (spec.md §3). At most one non-terminal
/// `ScoutRun` may exist globally at any instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutRun {
    pub id: ScoutRunId,
    pub trigger_type: TriggerType,
    pub source: String,
    pub max_strategies: Option<u32>,
    pub status: ScoutRunStatus,
    pub metrics: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScoutRun {
    pub fn new(trigger_type: TriggerType, source: impl Into<String>, max_strategies: Option<u32>, now: DateTime<Utc>) -> Self {
        Self {
            id: ScoutRunId::new(),
            trigger_type,
            source: source.into(),
            max_strategies,
            status: ScoutRunStatus::Pending,
            metrics: None,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }
}

/// A persistent cron-driven trigger for recurring ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutSchedule {
    pub id: ScoutScheduleId,
    pub name: String,
    pub cron_expression: String,
    pub source: String,
    pub max_strategies: Option<u32>,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoutSchedule {
    pub fn new(name: impl Into<String>, cron_expression: impl Into<String>, source: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ScoutScheduleId::new(),
            name: name.into(),
            cron_expression: cron_expression.into(),
            source: source.into(),
            max_strategies: None,
            enabled: true,
            last_run_at: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_run_starts_pending_and_nonterminal() {
        let run = ScoutRun::new(TriggerType::Manual, "stratninja", None, Utc::now());
        assert_eq!(run.status, ScoutRunStatus::Pending);
        assert!(!run.status.is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        for s in [ScoutRunStatus::Completed, ScoutRunStatus::Failed, ScoutRunStatus::Cancelled] {
            assert!(s.is_terminal());
        }
        for s in [ScoutRunStatus::Pending, ScoutRunStatus::Running] {
            assert!(!s.is_terminal());
        }
    }
}
