// SPDX-License-Identifier: MIT

//! `/optimizations` (spec.md §6.1, §4.4). Iteration submission and feedback
//! are driven by external engineer/analyst agents outside the documented
//! REST surface (spec.md §6.1 lists no such endpoint); `sf-coordinator`'s
//! `submit_iteration`/`record_feedback` exist for that out-of-band channel,
//! not for handlers in this module.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sf_core::{OptimizationRun, Page, RunId};
use sf_wire::{ControlRequest, CreateOptimizationRequest, OptimizationDetail, OptimizationListQuery};

use crate::error::ApiResult;
use crate::parse::parse_status;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateOptimizationRequest>,
) -> ApiResult<(StatusCode, Json<OptimizationRun>)> {
    let now = Utc::now();
    let run = OptimizationRun::new(req.name, req.base_strategy_id, req.config, now);
    state.store.submit_run(&run).await?;
    Ok((StatusCode::CREATED, Json(run)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<OptimizationListQuery>,
) -> ApiResult<Json<Page<OptimizationRun>>> {
    let status = q.status.as_deref().map(|s| parse_status("status", s)).transpose()?;
    let page = q.page.unwrap_or(1);
    let page_size = q.page_size.unwrap_or(20);
    let (runs, total) = state.store.list_runs(None, status, page, page_size).await?;
    Ok(Json(Page::new(runs, total, page, page_size)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<RunId>) -> ApiResult<Json<OptimizationDetail>> {
    let run = state.store.get_run(id).await?;
    let iterations = state.store.list_iterations(id).await?;
    Ok(Json(OptimizationDetail { run, iterations }))
}

pub async fn control(
    State(state): State<AppState>,
    Path(id): Path<RunId>,
    Json(req): Json<ControlRequest>,
) -> ApiResult<Json<OptimizationRun>> {
    Ok(Json(state.coordinator.control(id, req.action, None).await?))
}
