// SPDX-License-Identifier: MIT

//! `ScoutSchedule` / `ScoutRun` persistence. The global at-most-one-active
//! invariant (spec.md §3, testable property 5) is enforced at the schema
//! level by `idx_scout_runs_one_active`; this module maps the resulting
//! unique-violation onto [`sf_core::DomainError::ScoutRunActive`].

use crate::error::{map_write_error, not_found, StorageResult};
use crate::repo::rows::{scout_status_str, ScoutRunRow, ScoutScheduleRow};
use crate::store::Store;
use crate::StorageError;
use chrono::{DateTime, Utc};
use sf_core::{DomainError, ScoutRun, ScoutRunId, ScoutRunStatus, ScoutSchedule, ScoutScheduleId};

const SCOUT_RUN_COLUMNS: &str =
    "id, trigger_type, source, max_strategies, status, metrics, created_at, started_at, completed_at";
const SCOUT_SCHEDULE_COLUMNS: &str =
    "id, name, cron_expression, source, max_strategies, enabled, last_run_at, next_run_at, created_at, updated_at";

impl Store {
    /// Create a scout run, mapping a violation of the one-active-run
    /// partial unique index to `DomainError::ScoutRunActive` instead of a
    /// generic `Duplicate`.
    pub async fn create_scout_run(&self, run: &ScoutRun) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scout_runs
                (id, trigger_type, source, max_strategies, status, metrics, created_at, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(run.id.as_uuid())
        .bind(crate::repo::rows::trigger_type_str(run.trigger_type))
        .bind(&run.source)
        .bind(run.max_strategies.map(|v| v as i32))
        .bind(scout_status_str(run.status))
        .bind(&run.metrics)
        .bind(run.created_at)
        .bind(run.started_at)
        .bind(run.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StorageError::Domain(DomainError::ScoutRunActive)
            }
            _ => map_write_error(e, "scout_run"),
        })?;
        Ok(())
    }

    pub async fn get_scout_run(&self, id: ScoutRunId) -> StorageResult<ScoutRun> {
        let row = sqlx::query_as::<_, ScoutRunRow>(&format!(
            "SELECT {SCOUT_RUN_COLUMNS} FROM scout_runs WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_run"))?
        .ok_or_else(|| not_found("scout_run", id))?;
        row.try_into()
    }

    /// The single non-terminal scout run, if any (spec.md §4.7).
    pub async fn get_active_scout_run(&self) -> StorageResult<Option<ScoutRun>> {
        let row = sqlx::query_as::<_, ScoutRunRow>(&format!(
            "SELECT {SCOUT_RUN_COLUMNS} FROM scout_runs WHERE status IN ('pending', 'running') LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_run"))?;
        row.map(ScoutRun::try_from).transpose()
    }

    pub async fn mark_scout_run_running(&self, id: ScoutRunId, now: DateTime<Utc>) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE scout_runs SET status = 'running', started_at = $1 WHERE id = $2 AND status = 'pending'",
        )
        .bind(now)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_run"))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::InvalidTransition(format!("scout run {id} is not pending")).into());
        }
        Ok(())
    }

    async fn finish_scout_run(
        &self,
        id: ScoutRunId,
        status: ScoutRunStatus,
        metrics: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE scout_runs SET status = $1, metrics = COALESCE($2, metrics), completed_at = $3 \
             WHERE id = $4 AND status IN ('pending', 'running')",
        )
        .bind(scout_status_str(status))
        .bind(metrics)
        .bind(now)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_run"))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::InvalidTransition(format!("scout run {id} is already terminal")).into());
        }
        Ok(())
    }

    pub async fn mark_scout_run_completed(
        &self,
        id: ScoutRunId,
        metrics: serde_json::Value,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.finish_scout_run(id, ScoutRunStatus::Completed, Some(metrics), now).await
    }

    pub async fn mark_scout_run_failed(&self, id: ScoutRunId, now: DateTime<Utc>) -> StorageResult<()> {
        self.finish_scout_run(id, ScoutRunStatus::Failed, None, now).await
    }

    pub async fn cancel_scout_run(&self, id: ScoutRunId, now: DateTime<Utc>) -> StorageResult<()> {
        self.finish_scout_run(id, ScoutRunStatus::Cancelled, None, now).await
    }

    pub async fn list_scout_runs(&self, page: u32, page_size: u32) -> StorageResult<(Vec<ScoutRun>, u64)> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page - 1) as i64 * page_size as i64;
        let rows = sqlx::query_as::<_, ScoutRunRow>(&format!(
            "SELECT {SCOUT_RUN_COLUMNS} FROM scout_runs ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_run"))?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scout_runs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "scout_run"))?;
        let runs: StorageResult<Vec<_>> = rows.into_iter().map(ScoutRun::try_from).collect();
        Ok((runs?, total.max(0) as u64))
    }

    pub async fn create_scout_schedule(&self, schedule: &ScoutSchedule) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scout_schedules
                (id, name, cron_expression, source, max_strategies, enabled, last_run_at, next_run_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(schedule.id.as_uuid())
        .bind(&schedule.name)
        .bind(&schedule.cron_expression)
        .bind(&schedule.source)
        .bind(schedule.max_strategies.map(|v| v as i32))
        .bind(schedule.enabled)
        .bind(schedule.last_run_at)
        .bind(schedule.next_run_at)
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_schedule"))?;
        Ok(())
    }

    pub async fn get_scout_schedule(&self, id: ScoutScheduleId) -> StorageResult<ScoutSchedule> {
        let row = sqlx::query_as::<_, ScoutScheduleRow>(&format!(
            "SELECT {SCOUT_SCHEDULE_COLUMNS} FROM scout_schedules WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_schedule"))?
        .ok_or_else(|| not_found("scout_schedule", id))?;
        Ok(row.into())
    }

    /// Enabled schedules, for the cron loop to reload on each tick
    /// (spec.md §4.7).
    pub async fn list_enabled_scout_schedules(&self) -> StorageResult<Vec<ScoutSchedule>> {
        let rows = sqlx::query_as::<_, ScoutScheduleRow>(&format!(
            "SELECT {SCOUT_SCHEDULE_COLUMNS} FROM scout_schedules WHERE enabled = true"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_schedule"))?;
        Ok(rows.into_iter().map(ScoutSchedule::from).collect())
    }

    pub async fn list_scout_schedules(&self, page: u32, page_size: u32) -> StorageResult<(Vec<ScoutSchedule>, u64)> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page - 1) as i64 * page_size as i64;
        let rows = sqlx::query_as::<_, ScoutScheduleRow>(&format!(
            "SELECT {SCOUT_SCHEDULE_COLUMNS} FROM scout_schedules ORDER BY created_at ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_schedule"))?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scout_schedules")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "scout_schedule"))?;
        Ok((rows.into_iter().map(ScoutSchedule::from).collect(), total.max(0) as u64))
    }

    /// Full update of the editable schedule fields (spec.md §6.1 `PUT
    /// /agents/scout/schedules/{id}`). `next_run_at` is left untouched;
    /// the cron loop recomputes it from the possibly-new expression on its
    /// next tick.
    pub async fn update_scout_schedule(
        &self,
        id: ScoutScheduleId,
        name: &str,
        cron_expression: &str,
        source: &str,
        max_strategies: Option<u32>,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE scout_schedules SET name = $1, cron_expression = $2, source = $3, \
             max_strategies = $4, enabled = $5, updated_at = $6 WHERE id = $7",
        )
        .bind(name)
        .bind(cron_expression)
        .bind(source)
        .bind(max_strategies.map(|v| v as i32))
        .bind(enabled)
        .bind(now)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_schedule"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("scout_schedule", id));
        }
        Ok(())
    }

    pub async fn update_scout_schedule_enabled(&self, id: ScoutScheduleId, enabled: bool, now: DateTime<Utc>) -> StorageResult<()> {
        let result = sqlx::query("UPDATE scout_schedules SET enabled = $1, updated_at = $2 WHERE id = $3")
            .bind(enabled)
            .bind(now)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "scout_schedule"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("scout_schedule", id));
        }
        Ok(())
    }

    /// Record that a schedule fired, advancing its bookkeeping timestamps
    /// (spec.md §4.7). `next_run_at` is computed by the scout loop from the
    /// cron expression since that requires the `cron` crate, not available
    /// to this layer.
    pub async fn record_scout_schedule_fired(
        &self,
        id: ScoutScheduleId,
        next_run_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE scout_schedules SET last_run_at = $1, next_run_at = $2, updated_at = $1 WHERE id = $3",
        )
        .bind(now)
        .bind(next_run_at)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "scout_schedule"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("scout_schedule", id));
        }
        Ok(())
    }

    pub async fn delete_scout_schedule(&self, id: ScoutScheduleId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM scout_schedules WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "scout_schedule"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("scout_schedule", id));
        }
        Ok(())
    }
}
