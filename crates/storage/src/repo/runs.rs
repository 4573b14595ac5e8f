// SPDX-License-Identifier: MIT

//! `OptimizationRun` persistence: campaign CRUD, validated state
//! transitions, and the atomic "new best" update (spec.md §4.4).

use crate::error::{map_write_error, not_found, StorageResult};
use crate::repo::rows::{run_status_parse, run_status_str, RunRow};
use crate::store::Store;
use chrono::{DateTime, Utc};
use sf_core::{apply_transition, ControlAction, OptimizationRun, ResultId, RunStatus, StrategyId};

const RUN_COLUMNS: &str = "id, name, base_strategy_id, config, status, current_iteration, \
     best_strategy_id, best_result_id, termination_reason, created_at, updated_at, completed_at";

impl Store {
    pub async fn submit_run(&self, run: &OptimizationRun) -> StorageResult<()> {
        let config = serde_json::to_value(&run.config)
            .map_err(|e| sf_core::DomainError::Internal(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO optimization_runs
                (id, name, base_strategy_id, config, status, current_iteration,
                 best_strategy_id, best_result_id, termination_reason, created_at, updated_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(run.id.as_uuid())
        .bind(&run.name)
        .bind(run.base_strategy_id.as_uuid())
        .bind(config)
        .bind(run_status_str(run.status))
        .bind(run.current_iteration as i32)
        .bind(run.best_strategy_id.map(|v| v.as_uuid()))
        .bind(run.best_result_id.map(|v| v.as_uuid()))
        .bind(&run.termination_reason)
        .bind(run.created_at)
        .bind(run.updated_at)
        .bind(run.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_run"))?;
        Ok(())
    }

    pub async fn get_run(&self, id: sf_core::RunId) -> StorageResult<OptimizationRun> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM optimization_runs WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_run"))?
        .ok_or_else(|| not_found("optimization_run", id))?;
        row.try_into()
    }

    /// Filtered, paginated run listing (spec.md §6.1 `GET /optimizations`).
    pub async fn list_runs(
        &self,
        strategy_id: Option<StrategyId>,
        status: Option<RunStatus>,
        page: u32,
        page_size: u32,
    ) -> StorageResult<(Vec<OptimizationRun>, u64)> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page - 1) as i64 * page_size as i64;
        let strategy_id = strategy_id.map(|s| s.as_uuid());
        let status = status.map(run_status_str);

        let rows = sqlx::query_as::<_, RunRow>(&format!(
            r#"
            SELECT {RUN_COLUMNS} FROM optimization_runs
            WHERE ($1::uuid IS NULL OR base_strategy_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(strategy_id)
        .bind(status)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_run"))?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM optimization_runs \
             WHERE ($1::uuid IS NULL OR base_strategy_id = $1) AND ($2::text IS NULL OR status = $2)",
        )
        .bind(strategy_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_run"))?;

        let runs: StorageResult<Vec<_>> = rows.into_iter().map(OptimizationRun::try_from).collect();
        Ok((runs?, total.max(0) as u64))
    }

    /// Validate and persist a control action via
    /// [`sf_core::apply_transition`], recording `termination_reason` and
    /// `completed_at` on terminal transitions (spec.md §4.4).
    pub async fn run_state_update(
        &self,
        id: sf_core::RunId,
        action: ControlAction,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> StorageResult<OptimizationRun> {
        let current = self.get_run(id).await?;
        let next = apply_transition(current.status, action)?;

        let completed_at = if next.is_terminal() { Some(now) } else { None };
        sqlx::query(
            "UPDATE optimization_runs SET status = $1, termination_reason = COALESCE($2, termination_reason), \
             updated_at = $3, completed_at = COALESCE($4, completed_at) WHERE id = $5",
        )
        .bind(run_status_str(next))
        .bind(reason)
        .bind(now)
        .bind(completed_at)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_run"))?;

        self.get_run(id).await
    }

    /// Advance `current_iteration` by one (spec.md §4.4, called once per
    /// submitted iteration).
    pub async fn increment_iteration_count(&self, id: sf_core::RunId, now: DateTime<Utc>) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE optimization_runs SET current_iteration = current_iteration + 1, updated_at = $1 WHERE id = $2",
        )
        .bind(now)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_run"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("optimization_run", id));
        }
        Ok(())
    }

    /// Atomically record a new incumbent best (strategy, result) pair
    /// (spec.md §4.4 `optimization.new_best`). Unconditional: the caller
    /// has already decided via `sf_core::is_better` that this candidate
    /// wins.
    pub async fn set_best(
        &self,
        id: sf_core::RunId,
        strategy_id: StrategyId,
        result_id: ResultId,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE optimization_runs SET best_strategy_id = $1, best_result_id = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(strategy_id.as_uuid())
        .bind(result_id.as_uuid())
        .bind(now)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_run"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("optimization_run", id));
        }
        Ok(())
    }
}
