// SPDX-License-Identifier: MIT

//! BacktestConfig and BacktestJob — a single unit of scheduled backtest work.

use crate::error::DomainError;
use crate::strategy::StrategyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a backtest job.
    pub struct JobId;
}

crate::define_id! {
    /// Unique identifier for an optimization run, referenced by jobs it owns.
    pub struct RunId;
}

/// A stake expression: either a fixed amount or "unlimited".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stake {
    Amount(f64),
    Unlimited,
}

/// Value type embedded in jobs and runs describing what to backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub venue: String,
    pub symbols: Vec<String>,
    pub timeframe: String,
    /// Half-open range `[start, end)`, ISO-8601 date strings.
    pub start: String,
    pub end: String,
    pub initial_wallet: f64,
    pub max_open_trades: u32,
    pub stake: Stake,
}

impl BacktestConfig {
    /// Validate the invariants from spec.md §3: non-empty instrument list,
    /// non-empty time range, positive max-open-trades, wallet above the
    /// venue minimum.
    pub fn validate(&self, venue_minimum_wallet: f64) -> Result<(), DomainError> {
        if self.symbols.is_empty() {
            return Err(DomainError::Validation("symbols must not be empty".into()));
        }
        if self.start >= self.end {
            return Err(DomainError::Validation(format!(
                "time range must be non-empty: start={} end={}",
                self.start, self.end
            )));
        }
        if self.max_open_trades == 0 {
            return Err(DomainError::Validation("max_open_trades must be positive".into()));
        }
        if self.initial_wallet < venue_minimum_wallet {
            return Err(DomainError::Validation(format!(
                "initial_wallet {} below venue minimum {}",
                self.initial_wallet, venue_minimum_wallet
            )));
        }
        Ok(())
    }
}

/// Lifecycle status of a [`BacktestJob`]. COMPLETED/FAILED/CANCELLED are
/// absorbing (terminal) states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// An opaque handle identifying the sandbox container backing a running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxHandle(pub String);

/// One unit of scheduled backtest work (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestJob {
    pub id: JobId,
    pub strategy_id: StrategyId,
    pub optimization_run_id: Option<RunId>,
    pub config: BacktestConfig,
    /// Higher values dispatch first; FIFO within a priority class.
    pub priority: i32,
    pub status: JobStatus,
    pub sandbox_handle: Option<SandboxHandle>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BacktestJob {
    pub fn new(strategy_id: StrategyId, config: BacktestConfig, priority: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            strategy_id,
            optimization_run_id: None,
            config,
            priority,
            status: JobStatus::Pending,
            sandbox_handle: None,
            error: None,
            retry_count: 0,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Whether `cancel_job` may act on this job's current status
    /// (spec.md §4.1: PENDING/RUNNING only).
    pub fn is_cancellable(&self) -> bool {
        matches!(self.status, JobStatus::Pending | JobStatus::Running)
    }
}

/// Filters accepted when listing backtests (spec.md §6.1).
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub strategy_id: Option<StrategyId>,
    pub optimization_run_id: Option<RunId>,
    pub status: Option<JobStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub page: u32,
    pub page_size: u32,
}

impl JobQuery {
    pub fn new() -> Self {
        Self { page: 1, page_size: 20, ..Default::default() }
    }
}

/// Aggregate queue statistics exposed by `/backtests/queue/stats`
/// (spec.md §6.1) and used by the scheduler for observability (§4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending_jobs: u64,
    pub running_jobs: u64,
    pub avg_wait_ms: f64,
    pub avg_run_ms: f64,
}

#[cfg(test)]
#[path = "backtest_tests.rs"]
mod tests;
