// SPDX-License-Identifier: MIT

//! `/backtests` (spec.md §6.1). Submission only reaches `sf-storage`;
//! `backtest.submitted` is published by the scheduler's dispatcher at claim
//! time, not here (see `sf-scheduler::dispatcher`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sf_core::{BacktestJob, JobId, JobQuery, Page, QueueStats};
use sf_wire::{BacktestDetail, BacktestListQuery, CreateBacktestRequest, CreatedJob};

use crate::error::ApiResult;
use crate::parse::parse_status;
use crate::state::AppState;

/// No per-venue minimum wallet registry exists in scope; venues are opaque
/// identifiers here, so every submission validates against a flat floor.
const VENUE_MINIMUM_WALLET: f64 = 0.0;

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateBacktestRequest>,
) -> ApiResult<(StatusCode, Json<CreatedJob>)> {
    req.config.validate(VENUE_MINIMUM_WALLET)?;
    let now = Utc::now();
    let mut job = BacktestJob::new(req.strategy_id, req.config, req.priority.unwrap_or(0), now);
    job.optimization_run_id = req.optimization_run_id;
    state.store.submit_job(&job).await?;
    Ok((StatusCode::CREATED, Json(CreatedJob { job_id: job.id })))
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<BacktestListQuery>,
) -> ApiResult<Json<Page<BacktestJob>>> {
    let status = q.status.as_deref().map(|s| parse_status("status", s)).transpose()?;
    let query = JobQuery {
        strategy_id: q.strategy_id,
        optimization_run_id: q.optimization_run_id,
        status,
        created_after: q.created_after,
        created_before: q.created_before,
        page: q.page.unwrap_or(1),
        page_size: q.page_size.unwrap_or(20),
    };
    let (jobs, total) = state.store.list_jobs(&query).await?;
    Ok(Json(Page::new(jobs, total, query.page, query.page_size)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<JobId>) -> ApiResult<Json<BacktestDetail>> {
    let job = state.store.get_job(id).await?;
    let result = state.store.get_result_by_job(id).await?;
    Ok(Json(BacktestDetail { job, result }))
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<JobId>) -> ApiResult<StatusCode> {
    let now = Utc::now();
    state.store.cancel_job(id, now).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn queue_stats(State(state): State<AppState>) -> ApiResult<Json<QueueStats>> {
    Ok(Json(state.store.queue_stats().await?))
}
