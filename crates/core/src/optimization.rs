// SPDX-License-Identifier: MIT

//! OptimizationRun / OptimizationIteration — multi-iteration campaign
//! state machine (spec.md §3, §4.4).

use crate::backtest::{BacktestConfig, JobId, RunId};
use crate::error::DomainError;
use crate::result::{Metrics, ResultId};
use crate::strategy::StrategyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an optimization iteration.
    pub struct IterationId;
}

/// Selection objective for "better than current best" comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    MaximizeSharpe,
    MaximizeProfit,
    MinimizeDrawdown,
    Balanced,
}

/// Numeric thresholds a result must clear to be "criteria-passing".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criteria {
    pub min_sharpe: f64,
    pub min_profit_pct: f64,
    pub max_drawdown_pct: f64,
    pub min_trades: u32,
    pub min_win_rate: f64,
}

impl Criteria {
    pub fn passes(&self, m: &Metrics) -> bool {
        m.sharpe_ratio >= self.min_sharpe
            && m.profit_pct >= self.min_profit_pct
            && m.max_drawdown_pct <= self.max_drawdown_pct
            && m.total_trades >= self.min_trades
            && m.win_rate >= self.min_win_rate
    }
}

/// Embedded config for an optimization run: a backtest config plus
/// criteria thresholds, a mode, and an iteration cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    pub backtest: BacktestConfig,
    pub criteria: Criteria,
    pub mode: OptimizationMode,
    pub max_iterations: u32,
}

/// Composite score for [`OptimizationMode::Balanced`]:
/// `Sharpe − 0.5·drawdown% + 0.1·profit%` (spec.md §4.4, resolved in
/// SPEC_FULL.md §5.3 — ties keep the incumbent).
pub fn balanced_score(m: &Metrics) -> f64 {
    m.sharpe_ratio - 0.5 * m.max_drawdown_pct + 0.1 * m.profit_pct
}

/// Whether `candidate` is strictly better than `incumbent` under `mode`,
/// restricted to criteria-passing candidates (spec.md §4.4).
pub fn is_better(mode: OptimizationMode, criteria: &Criteria, incumbent: &Metrics, candidate: &Metrics) -> bool {
    if !criteria.passes(candidate) {
        return false;
    }
    match mode {
        OptimizationMode::MaximizeSharpe => candidate.sharpe_ratio > incumbent.sharpe_ratio,
        OptimizationMode::MaximizeProfit => candidate.profit_pct > incumbent.profit_pct,
        OptimizationMode::MinimizeDrawdown => candidate.max_drawdown_pct < incumbent.max_drawdown_pct,
        OptimizationMode::Balanced => balanced_score(candidate) > balanced_score(incumbent),
    }
}

/// Run status (spec.md §4.4 state diagram). PENDING/RUNNING/PAUSED are
/// non-terminal; COMPLETED/FAILED/CANCELLED are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Cancelled,
    Failed,
}

crate::simple_display! {
    RunStatus {
        Pending => "pending",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Cancelled => "cancelled",
        Failed => "failed",
    }
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Cancelled | RunStatus::Failed)
    }
}

/// An externally-invoked control action on a run (spec.md §4.4, §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Pause,
    Resume,
    Cancel,
    Complete,
    Fail,
}

/// Validate and apply a control action or automatic transition, returning
/// the new status. Pure function: the caller is responsible for persisting
/// the result and recording `termination_reason` on terminal transitions.
pub fn apply_transition(current: RunStatus, action: ControlAction) -> Result<RunStatus, DomainError> {
    use ControlAction::*;
    use RunStatus::*;
    match (current, action) {
        (Running, Pause) => Ok(Paused),
        (Paused, Resume) => Ok(Running),
        (s, Cancel) if !s.is_terminal() => Ok(Cancelled),
        (Running, Complete) => Ok(Completed),
        // `complete` is idempotent on an already-completed run.
        (Completed, Complete) => Ok(Completed),
        (s, Fail) if !s.is_terminal() => Ok(Failed),
        (s, _) => Err(DomainError::OptimizationNotRunning(format!(
            "cannot apply {action:?} from state {s}"
        ))),
    }
}

/// A long-running optimization campaign (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRun {
    pub id: RunId,
    pub name: String,
    pub base_strategy_id: StrategyId,
    pub config: OptimizationConfig,
    pub status: RunStatus,
    pub current_iteration: u32,
    pub best_strategy_id: Option<StrategyId>,
    pub best_result_id: Option<ResultId>,
    pub termination_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OptimizationRun {
    pub fn new(name: impl Into<String>, base_strategy_id: StrategyId, config: OptimizationConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: RunId::new(),
            name: name.into(),
            base_strategy_id,
            config,
            status: RunStatus::Pending,
            current_iteration: 0,
            best_strategy_id: None,
            best_result_id: None,
            termination_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Whether the max-iterations termination criterion has fired.
    pub fn reached_max_iterations(&self) -> bool {
        self.current_iteration >= self.config.max_iterations
    }
}

/// Approval state an external analyst agent assigns to an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
    NeedsIteration,
}

crate::simple_display! {
    ApprovalState {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        NeedsIteration => "needs_iteration",
    }
}

/// One (strategy-variant, backtest-job, feedback) tuple within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationIteration {
    pub id: IterationId,
    pub run_id: RunId,
    /// 1-based, unique within the run.
    pub iteration_number: u32,
    pub strategy_id: StrategyId,
    pub job_id: JobId,
    pub result_id: Option<ResultId>,
    pub engineer_changes: Option<String>,
    pub analyst_feedback: Option<String>,
    pub approval: ApprovalState,
    pub created_at: DateTime<Utc>,
}

impl OptimizationIteration {
    pub fn new(run_id: RunId, iteration_number: u32, strategy_id: StrategyId, job_id: JobId, now: DateTime<Utc>) -> Self {
        Self {
            id: IterationId::new(),
            run_id,
            iteration_number,
            strategy_id,
            job_id,
            result_id: None,
            engineer_changes: None,
            analyst_feedback: None,
            approval: ApprovalState::Pending,
            created_at: now,
        }
    }
}

#[cfg(test)]
#[path = "optimization_tests.rs"]
mod tests;
