// SPDX-License-Identifier: MIT

//! `/agents/scout` (spec.md §6.1, §4.7).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use cron::Schedule;
use sf_core::{DomainError, Page, ScoutRun, ScoutRunId, ScoutSchedule, ScoutScheduleId};
use sf_wire::{PageQuery, ScoutScheduleRequest, ScoutTriggerRequest};
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn trigger(
    State(state): State<AppState>,
    Json(req): Json<ScoutTriggerRequest>,
) -> ApiResult<(StatusCode, Json<ScoutRun>)> {
    let run = state.scout.trigger_manual(req.source, req.max_strategies).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

pub async fn list_runs(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<ScoutRun>>> {
    let page = q.page.unwrap_or(1);
    let page_size = q.page_size.unwrap_or(20);
    let (runs, total) = state.scout.store().list_scout_runs(page, page_size).await?;
    Ok(Json(Page::new(runs, total, page, page_size)))
}

pub async fn get_run(State(state): State<AppState>, Path(id): Path<ScoutRunId>) -> ApiResult<Json<ScoutRun>> {
    Ok(Json(state.scout.store().get_scout_run(id).await?))
}

pub async fn cancel_run(State(state): State<AppState>, Path(id): Path<ScoutRunId>) -> ApiResult<StatusCode> {
    state.scout.cancel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_cron(expression: &str) -> ApiResult<()> {
    Schedule::from_str(expression)
        .map(|_| ())
        .map_err(|e| ApiError::Domain(DomainError::Validation(format!("invalid cron expression: {e}"))))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<ScoutScheduleRequest>,
) -> ApiResult<(StatusCode, Json<ScoutSchedule>)> {
    validate_cron(&req.cron_expression)?;
    let now = Utc::now();
    let mut schedule = ScoutSchedule::new(req.name, req.cron_expression, req.source, now);
    schedule.max_strategies = req.max_strategies;
    schedule.enabled = req.enabled.unwrap_or(true);
    state.scout.store().create_scout_schedule(&schedule).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

pub async fn list_schedules(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<Page<ScoutSchedule>>> {
    let page = q.page.unwrap_or(1);
    let page_size = q.page_size.unwrap_or(20);
    let (schedules, total) = state.scout.store().list_scout_schedules(page, page_size).await?;
    Ok(Json(Page::new(schedules, total, page, page_size)))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<ScoutScheduleId>,
) -> ApiResult<Json<ScoutSchedule>> {
    Ok(Json(state.scout.store().get_scout_schedule(id).await?))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<ScoutScheduleId>,
    Json(req): Json<ScoutScheduleRequest>,
) -> ApiResult<Json<ScoutSchedule>> {
    validate_cron(&req.cron_expression)?;
    let now = Utc::now();
    state
        .scout
        .store()
        .update_scout_schedule(
            id,
            &req.name,
            &req.cron_expression,
            &req.source,
            req.max_strategies,
            req.enabled.unwrap_or(true),
            now,
        )
        .await?;
    Ok(Json(state.scout.store().get_scout_schedule(id).await?))
}

pub async fn delete_schedule(State(state): State<AppState>, Path(id): Path<ScoutScheduleId>) -> ApiResult<StatusCode> {
    state.scout.store().delete_scout_schedule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
