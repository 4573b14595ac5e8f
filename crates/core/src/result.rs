// SPDX-License-Identifier: MIT

//! BacktestResult — immutable, one-per-completed-job performance record.

use crate::backtest::JobId;
use crate::strategy::StrategyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Unique identifier for a backtest result.
    pub struct ResultId;
}

/// Standard performance metrics produced by a completed backtest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: f64,
    pub total_profit: f64,
    pub profit_pct: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub avg_trade_duration_secs: f64,
    pub avg_winning_duration_secs: f64,
    pub avg_losing_duration_secs: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
}

/// Per-instrument metric breakdown, keyed by symbol.
pub type InstrumentBreakdown = HashMap<String, Metrics>;

/// Immutable, one-per-completed-job performance record (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub id: ResultId,
    pub job_id: JobId,
    pub strategy_id: StrategyId,
    pub metrics: Metrics,
    #[serde(default)]
    pub per_instrument: InstrumentBreakdown,
    pub raw_log: String,
    /// Serialized trade ledger, opaque beyond storage/retrieval.
    pub trade_ledger: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl BacktestResult {
    pub fn new(
        job_id: JobId,
        strategy_id: StrategyId,
        metrics: Metrics,
        per_instrument: InstrumentBreakdown,
        raw_log: String,
        trade_ledger: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ResultId::new(),
            job_id,
            strategy_id,
            metrics,
            per_instrument,
            raw_log,
            trade_ledger,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_carries_owning_job_and_strategy() {
        let job_id = JobId::new();
        let strategy_id = StrategyId::new();
        let result = BacktestResult::new(
            job_id,
            strategy_id,
            Metrics::default(),
            InstrumentBreakdown::default(),
            String::new(),
            None,
            Utc::now(),
        );
        assert_eq!(result.job_id, job_id);
        assert_eq!(result.strategy_id, strategy_id);
    }
}
