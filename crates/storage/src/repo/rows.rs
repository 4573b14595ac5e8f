// SPDX-License-Identifier: MIT

//! Raw `sqlx::FromRow` row shapes and their conversion into `sf-core`
//! domain types. Kept separate from the domain types themselves so SQL
//! column shape (plain `Uuid`, `String` status, promoted numeric columns)
//! can diverge from the typed domain representation.

use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use sf_core::{
    ApprovalState, BacktestConfig, BacktestJob, BacktestResult, Fingerprint, InstrumentBreakdown,
    IterationId, JobId, JobStatus, Metrics, OptimizationConfig, OptimizationIteration,
    OptimizationRun, ResultId, RunId, RunStatus, SandboxHandle, ScoutRun, ScoutRunId,
    ScoutRunStatus, ScoutSchedule, ScoutScheduleId, Strategy, StrategyId, TriggerType,
};
use sqlx::FromRow;
use uuid::Uuid;

fn bad(entity: &'static str, detail: impl std::fmt::Display) -> StorageError {
    StorageError::Domain(sf_core::DomainError::Internal(format!(
        "corrupt {entity} row: {detail}"
    )))
}

pub fn job_status_str(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Pending => "pending",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

pub fn job_status_parse(s: &str) -> StorageResult<JobStatus> {
    Ok(match s {
        "pending" => JobStatus::Pending,
        "running" => JobStatus::Running,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        "cancelled" => JobStatus::Cancelled,
        other => return Err(bad("backtest_job", format!("unknown status {other}"))),
    })
}

pub fn run_status_str(s: RunStatus) -> &'static str {
    match s {
        RunStatus::Pending => "pending",
        RunStatus::Running => "running",
        RunStatus::Paused => "paused",
        RunStatus::Completed => "completed",
        RunStatus::Cancelled => "cancelled",
        RunStatus::Failed => "failed",
    }
}

pub fn run_status_parse(s: &str) -> StorageResult<RunStatus> {
    Ok(match s {
        "pending" => RunStatus::Pending,
        "running" => RunStatus::Running,
        "paused" => RunStatus::Paused,
        "completed" => RunStatus::Completed,
        "cancelled" => RunStatus::Cancelled,
        "failed" => RunStatus::Failed,
        other => return Err(bad("optimization_run", format!("unknown status {other}"))),
    })
}

pub fn approval_str(a: ApprovalState) -> &'static str {
    match a {
        ApprovalState::Pending => "pending",
        ApprovalState::Approved => "approved",
        ApprovalState::Rejected => "rejected",
        ApprovalState::NeedsIteration => "needs_iteration",
    }
}

pub fn approval_parse(s: &str) -> StorageResult<ApprovalState> {
    Ok(match s {
        "pending" => ApprovalState::Pending,
        "approved" => ApprovalState::Approved,
        "rejected" => ApprovalState::Rejected,
        "needs_iteration" => ApprovalState::NeedsIteration,
        other => return Err(bad("optimization_iteration", format!("unknown approval {other}"))),
    })
}

pub fn trigger_type_str(t: TriggerType) -> &'static str {
    match t {
        TriggerType::Manual => "manual",
        TriggerType::Scheduled => "scheduled",
        TriggerType::Event => "event",
    }
}

pub fn trigger_type_parse(s: &str) -> StorageResult<TriggerType> {
    Ok(match s {
        "manual" => TriggerType::Manual,
        "scheduled" => TriggerType::Scheduled,
        "event" => TriggerType::Event,
        other => return Err(bad("scout_run", format!("unknown trigger_type {other}"))),
    })
}

pub fn scout_status_str(s: ScoutRunStatus) -> &'static str {
    match s {
        ScoutRunStatus::Pending => "pending",
        ScoutRunStatus::Running => "running",
        ScoutRunStatus::Completed => "completed",
        ScoutRunStatus::Failed => "failed",
        ScoutRunStatus::Cancelled => "cancelled",
    }
}

pub fn scout_status_parse(s: &str) -> StorageResult<ScoutRunStatus> {
    Ok(match s {
        "pending" => ScoutRunStatus::Pending,
        "running" => ScoutRunStatus::Running,
        "completed" => ScoutRunStatus::Completed,
        "failed" => ScoutRunStatus::Failed,
        "cancelled" => ScoutRunStatus::Cancelled,
        other => return Err(bad("scout_run", format!("unknown status {other}"))),
    })
}

#[derive(Debug, FromRow)]
pub struct StrategyRow {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub fingerprint: String,
    pub parent_id: Option<Uuid>,
    pub generation: i32,
    pub metadata: serde_json::Value,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<StrategyRow> for Strategy {
    type Error = StorageError;

    fn try_from(r: StrategyRow) -> Result<Self, Self::Error> {
        Ok(Strategy {
            id: StrategyId::from_uuid(r.id),
            name: r.name,
            code: r.code,
            fingerprint: Fingerprint(r.fingerprint),
            parent_id: r.parent_id.map(StrategyId::from_uuid),
            generation: r.generation.try_into().map_err(|_| bad("strategy", "negative generation"))?,
            metadata: r.metadata,
            tags: r.tags,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub strategy_id: Uuid,
    pub optimization_run_id: Option<Uuid>,
    pub config: serde_json::Value,
    pub priority: i32,
    pub status: String,
    pub sandbox_handle: Option<String>,
    pub error: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for BacktestJob {
    type Error = StorageError;

    fn try_from(r: JobRow) -> Result<Self, Self::Error> {
        let config: BacktestConfig =
            serde_json::from_value(r.config).map_err(|e| bad("backtest_job.config", e))?;
        Ok(BacktestJob {
            id: JobId::from_uuid(r.id),
            strategy_id: StrategyId::from_uuid(r.strategy_id),
            optimization_run_id: r.optimization_run_id.map(RunId::from_uuid),
            config,
            priority: r.priority,
            status: job_status_parse(&r.status)?,
            sandbox_handle: r.sandbox_handle.map(SandboxHandle),
            error: r.error,
            retry_count: r.retry_count.try_into().unwrap_or(0),
            created_at: r.created_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ResultRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub strategy_id: Uuid,
    pub metrics: serde_json::Value,
    pub per_instrument: serde_json::Value,
    pub raw_log: String,
    pub trade_ledger: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ResultRow> for BacktestResult {
    type Error = StorageError;

    fn try_from(r: ResultRow) -> Result<Self, Self::Error> {
        let metrics: Metrics =
            serde_json::from_value(r.metrics).map_err(|e| bad("backtest_result.metrics", e))?;
        let per_instrument: InstrumentBreakdown = serde_json::from_value(r.per_instrument)
            .map_err(|e| bad("backtest_result.per_instrument", e))?;
        Ok(BacktestResult {
            id: ResultId::from_uuid(r.id),
            job_id: JobId::from_uuid(r.job_id),
            strategy_id: StrategyId::from_uuid(r.strategy_id),
            metrics,
            per_instrument,
            raw_log: r.raw_log,
            trade_ledger: r.trade_ledger,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct RunRow {
    pub id: Uuid,
    pub name: String,
    pub base_strategy_id: Uuid,
    pub config: serde_json::Value,
    pub status: String,
    pub current_iteration: i32,
    pub best_strategy_id: Option<Uuid>,
    pub best_result_id: Option<Uuid>,
    pub termination_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RunRow> for OptimizationRun {
    type Error = StorageError;

    fn try_from(r: RunRow) -> Result<Self, Self::Error> {
        let config: OptimizationConfig =
            serde_json::from_value(r.config).map_err(|e| bad("optimization_run.config", e))?;
        Ok(OptimizationRun {
            id: RunId::from_uuid(r.id),
            name: r.name,
            base_strategy_id: StrategyId::from_uuid(r.base_strategy_id),
            config,
            status: run_status_parse(&r.status)?,
            current_iteration: r.current_iteration.try_into().unwrap_or(0),
            best_strategy_id: r.best_strategy_id.map(StrategyId::from_uuid),
            best_result_id: r.best_result_id.map(ResultId::from_uuid),
            termination_reason: r.termination_reason,
            created_at: r.created_at,
            updated_at: r.updated_at,
            completed_at: r.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct IterationRow {
    pub id: Uuid,
    pub run_id: Uuid,
    pub iteration_number: i32,
    pub strategy_id: Uuid,
    pub job_id: Uuid,
    pub result_id: Option<Uuid>,
    pub engineer_changes: Option<String>,
    pub analyst_feedback: Option<String>,
    pub approval: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<IterationRow> for OptimizationIteration {
    type Error = StorageError;

    fn try_from(r: IterationRow) -> Result<Self, Self::Error> {
        Ok(OptimizationIteration {
            id: IterationId::from_uuid(r.id),
            run_id: RunId::from_uuid(r.run_id),
            iteration_number: r.iteration_number.try_into().unwrap_or(0),
            strategy_id: StrategyId::from_uuid(r.strategy_id),
            job_id: JobId::from_uuid(r.job_id),
            result_id: r.result_id.map(ResultId::from_uuid),
            engineer_changes: r.engineer_changes,
            analyst_feedback: r.analyst_feedback,
            approval: approval_parse(&r.approval)?,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ScoutRunRow {
    pub id: Uuid,
    pub trigger_type: String,
    pub source: String,
    pub max_strategies: Option<i32>,
    pub status: String,
    pub metrics: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ScoutRunRow> for ScoutRun {
    type Error = StorageError;

    fn try_from(r: ScoutRunRow) -> Result<Self, Self::Error> {
        Ok(ScoutRun {
            id: ScoutRunId::from_uuid(r.id),
            trigger_type: trigger_type_parse(&r.trigger_type)?,
            source: r.source,
            max_strategies: r.max_strategies.map(|v| v as u32),
            status: scout_status_parse(&r.status)?,
            metrics: r.metrics,
            created_at: r.created_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ScoutScheduleRow {
    pub id: Uuid,
    pub name: String,
    pub cron_expression: String,
    pub source: String,
    pub max_strategies: Option<i32>,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScoutScheduleRow> for ScoutSchedule {
    fn from(r: ScoutScheduleRow) -> Self {
        ScoutSchedule {
            id: ScoutScheduleId::from_uuid(r.id),
            name: r.name,
            cron_expression: r.cron_expression,
            source: r.source,
            max_strategies: r.max_strategies.map(|v| v as u32),
            enabled: r.enabled,
            last_run_at: r.last_run_at,
            next_run_at: r.next_run_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
