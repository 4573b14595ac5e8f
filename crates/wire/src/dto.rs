// SPDX-License-Identifier: MIT

//! Request/response DTOs for the REST surface (spec.md §6.1).
//!
//! Handlers in `sf-api` are thin: these types are what actually cross the
//! wire, separate from the domain types in `sf-core` so the HTTP shape can
//! evolve independently (e.g. optional fields on create, flattened query
//! params) without touching persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_core::{
    BacktestConfig, ControlAction, JobId, OptimizationConfig, RunId, StrategyId,
};

/// `POST /strategies` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStrategyRequest {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<StrategyId>,
}

/// `PUT /strategies/{id}` body — descriptive metadata only, per spec.md §3
/// ("never mutated except for descriptive metadata").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStrategyRequest {
    pub name: String,
    pub description: Option<String>,
}

/// `GET /strategies` query params (spec.md §6.1).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategyListQuery {
    pub name_pattern: Option<String>,
    pub min_sharpe: Option<f64>,
    pub min_profit_pct: Option<f64>,
    pub max_drawdown_pct: Option<f64>,
    pub min_trades: Option<i64>,
    pub order_by: Option<String>,
    #[serde(default)]
    pub ascending: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// `GET /strategies/{id}/lineage` query params.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineageQuery {
    pub depth: Option<u32>,
}

/// `POST /backtests` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBacktestRequest {
    pub strategy_id: StrategyId,
    pub config: BacktestConfig,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub optimization_run_id: Option<RunId>,
}

/// `GET /backtests` query params.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BacktestListQuery {
    pub strategy_id: Option<StrategyId>,
    pub optimization_run_id: Option<RunId>,
    pub status: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// `POST /optimizations` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOptimizationRequest {
    pub name: String,
    pub base_strategy_id: StrategyId,
    pub config: OptimizationConfig,
}

/// `GET /optimizations` query params.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizationListQuery {
    pub status: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// `POST /optimizations/{id}/control` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub action: ControlAction,
}

/// `POST /agents/scout/trigger` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutTriggerRequest {
    pub source: String,
    #[serde(default)]
    pub max_strategies: Option<u32>,
}

/// Create/update body for `/agents/scout/schedules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutScheduleRequest {
    pub name: String,
    pub cron_expression: String,
    pub source: String,
    #[serde(default)]
    pub max_strategies: Option<u32>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// A single backtest, with its result attached when completed (spec.md
/// §6.1: `GET /backtests/{id}` "returns job and result if completed").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestDetail {
    pub job: sf_core::BacktestJob,
    pub result: Option<sf_core::BacktestResult>,
}

/// An optimization run with its iterations (spec.md §6.1: `GET
/// /optimizations/{id}` "returns run + iterations").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationDetail {
    pub run: sf_core::OptimizationRun,
    pub iterations: Vec<sf_core::OptimizationIteration>,
}

/// `JobId` referenced by a freshly-submitted job, returned from `POST
/// /backtests` (201).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedJob {
    pub job_id: JobId,
}

/// Health status map returned by `/health`, `/health/live`, `/health/ready`
/// (spec.md §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthState,
    pub components: std::collections::BTreeMap<String, HealthState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Ok,
    Degraded,
    Unavailable,
}

/// `GET /backtest-results` query params (spec.md §6.1: "query-only, paginated").
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultListQuery {
    pub strategy_id: Option<StrategyId>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Pagination-only query params shared by `/agents/scout/runs` and
/// `/agents/scout/schedules`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Scheduler + store + hub counters returned by `/metrics` (spec.md §6.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsReport {
    pub pending_jobs: u64,
    pub running_jobs: u64,
    pub avg_wait_ms: f64,
    pub avg_run_ms: f64,
    pub hub_connected_clients: u64,
    pub active_scout_run: bool,
}

/// Server-side wildcard policy for the `contains` filter operator
/// (SPEC_FULL.md §5.1): the server always wraps the client-supplied
/// substring in `%...%` itself.
pub fn wrap_contains_pattern(value: &str) -> String {
    format!("%{value}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_is_wrapped_by_the_server() {
        assert_eq!(wrap_contains_pattern("ema_cross"), "%ema_cross%");
    }
}
