// SPDX-License-Identifier: MIT

//! `BacktestResult` persistence: immutable, one-per-completed-job
//! performance records (spec.md §3). Promoted numeric fields
//! (`sharpe_ratio`, `profit_pct`, `max_drawdown_pct`, `total_trades`,
//! `win_rate`) are denormalized out of `metrics` at insert time so
//! `search_strategies` and `/backtest-results` range filters never parse
//! the JSON document.

use crate::error::{map_write_error, not_found, StorageResult};
use crate::repo::rows::ResultRow;
use crate::store::Store;
use sf_core::{BacktestResult, JobId, ResultId, StrategyId};

const RESULT_COLUMNS: &str =
    "id, job_id, strategy_id, metrics, per_instrument, raw_log, trade_ledger, created_at";

impl Store {
    /// Insert the one-per-job result row (spec.md §3 `UNIQUE (job_id)`).
    /// The caller (the scheduler's worker task) is responsible for having
    /// already transitioned the owning job to COMPLETED in the same
    /// transaction-adjacent call, per the invariant "created iff owning
    /// job is COMPLETED".
    pub async fn create_result(&self, result: &BacktestResult) -> StorageResult<()> {
        let metrics = serde_json::to_value(&result.metrics)
            .map_err(|e| sf_core::DomainError::Internal(e.to_string()))?;
        let per_instrument = serde_json::to_value(&result.per_instrument)
            .map_err(|e| sf_core::DomainError::Internal(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO backtest_results
                (id, job_id, strategy_id, metrics, per_instrument, raw_log, trade_ledger, created_at,
                 sharpe_ratio, profit_pct, max_drawdown_pct, total_trades, win_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(result.id.as_uuid())
        .bind(result.job_id.as_uuid())
        .bind(result.strategy_id.as_uuid())
        .bind(metrics)
        .bind(per_instrument)
        .bind(&result.raw_log)
        .bind(&result.trade_ledger)
        .bind(result.created_at)
        .bind(result.metrics.sharpe_ratio)
        .bind(result.metrics.profit_pct)
        .bind(result.metrics.max_drawdown_pct)
        .bind(result.metrics.total_trades as i32)
        .bind(result.metrics.win_rate)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_result"))?;
        Ok(())
    }

    pub async fn get_result(&self, id: ResultId) -> StorageResult<BacktestResult> {
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM backtest_results WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_result"))?
        .ok_or_else(|| not_found("backtest_result", id))?;
        row.try_into()
    }

    /// At most one result per job (spec.md §3 invariant, testable property 3).
    pub async fn get_result_by_job(&self, job_id: JobId) -> StorageResult<Option<BacktestResult>> {
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM backtest_results WHERE job_id = $1"
        ))
        .bind(job_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_result"))?;
        row.map(BacktestResult::try_from).transpose()
    }

    /// Query-only, paginated listing for `GET /backtest-results` (spec.md §6.1).
    pub async fn list_results(
        &self,
        strategy_id: Option<StrategyId>,
        page: u32,
        page_size: u32,
    ) -> StorageResult<(Vec<BacktestResult>, u64)> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page - 1) as i64 * page_size as i64;
        let strategy_id = strategy_id.map(StrategyId::as_uuid);

        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            r#"
            SELECT {RESULT_COLUMNS} FROM backtest_results
            WHERE ($1::uuid IS NULL OR strategy_id = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(strategy_id)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_result"))?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM backtest_results WHERE ($1::uuid IS NULL OR strategy_id = $1)",
        )
        .bind(strategy_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "backtest_result"))?;

        let results: StorageResult<Vec<_>> = rows.into_iter().map(BacktestResult::try_from).collect();
        Ok((results?, total.max(0) as u64))
    }
}
