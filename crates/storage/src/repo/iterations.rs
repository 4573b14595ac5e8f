// SPDX-License-Identifier: MIT

//! `OptimizationIteration` persistence: one (strategy-variant, job,
//! feedback) tuple per optimization step (spec.md §3, §4.4).

use crate::error::{map_write_error, not_found, StorageResult};
use crate::repo::rows::{approval_parse, approval_str, IterationRow};
use crate::store::Store;
use sf_core::{ApprovalState, IterationId, OptimizationIteration, ResultId, RunId};

const ITERATION_COLUMNS: &str = "id, run_id, iteration_number, strategy_id, job_id, result_id, \
     engineer_changes, analyst_feedback, approval, created_at";

impl Store {
    /// Insert a new iteration. Fails with `Duplicate` if `iteration_number`
    /// is already taken within the run (spec.md §3 `UNIQUE (run_id,
    /// iteration_number)`).
    pub async fn add_iteration(&self, iteration: &OptimizationIteration) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO optimization_iterations
                (id, run_id, iteration_number, strategy_id, job_id, result_id,
                 engineer_changes, analyst_feedback, approval, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(iteration.id.as_uuid())
        .bind(iteration.run_id.as_uuid())
        .bind(iteration.iteration_number as i32)
        .bind(iteration.strategy_id.as_uuid())
        .bind(iteration.job_id.as_uuid())
        .bind(iteration.result_id.map(|v| v.as_uuid()))
        .bind(&iteration.engineer_changes)
        .bind(&iteration.analyst_feedback)
        .bind(approval_str(iteration.approval))
        .bind(iteration.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_iteration"))?;
        Ok(())
    }

    pub async fn get_iteration(&self, id: IterationId) -> StorageResult<OptimizationIteration> {
        let row = sqlx::query_as::<_, IterationRow>(&format!(
            "SELECT {ITERATION_COLUMNS} FROM optimization_iterations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_iteration"))?
        .ok_or_else(|| not_found("optimization_iteration", id))?;
        row.try_into()
    }

    /// Attach the result once the iteration's backtest completes, and/or
    /// record an analyst's approval decision (spec.md §4.4). `result_id`
    /// is left unchanged if `None`.
    pub async fn update_iteration_feedback(
        &self,
        id: IterationId,
        result_id: Option<ResultId>,
        feedback: Option<&str>,
        approval: ApprovalState,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE optimization_iterations \
             SET result_id = COALESCE($1, result_id), analyst_feedback = COALESCE($2, analyst_feedback), approval = $3 \
             WHERE id = $4",
        )
        .bind(result_id.map(|v| v.as_uuid()))
        .bind(feedback)
        .bind(approval_str(approval))
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_iteration"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("optimization_iteration", id));
        }
        Ok(())
    }

    /// All iterations of a run, in iteration order (spec.md §6.1
    /// `GET /optimizations/{id}`).
    pub async fn list_iterations(&self, run_id: RunId) -> StorageResult<Vec<OptimizationIteration>> {
        let rows = sqlx::query_as::<_, IterationRow>(&format!(
            "SELECT {ITERATION_COLUMNS} FROM optimization_iterations WHERE run_id = $1 ORDER BY iteration_number ASC"
        ))
        .bind(run_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_iteration"))?;
        rows.into_iter().map(OptimizationIteration::try_from).collect()
    }

    /// Used by the coordinator to pick the next `iteration_number` without
    /// a separate counter table.
    pub async fn next_iteration_number(&self, run_id: RunId) -> StorageResult<u32> {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(iteration_number) FROM optimization_iterations WHERE run_id = $1",
        )
        .bind(run_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "optimization_iteration"))?;
        Ok(max.unwrap_or(0) as u32 + 1)
    }
}
