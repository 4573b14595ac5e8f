// SPDX-License-Identifier: MIT

//! `/backtest-results` (spec.md §6.1: "query-only, paginated").

use axum::extract::{Path, Query, State};
use axum::Json;
use sf_core::{BacktestResult, Page, ResultId};
use sf_wire::ResultListQuery;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<ResultListQuery>,
) -> ApiResult<Json<Page<BacktestResult>>> {
    let page = q.page.unwrap_or(1);
    let page_size = q.page_size.unwrap_or(20);
    let (results, total) = state.store.list_results(q.strategy_id, page, page_size).await?;
    Ok(Json(Page::new(results, total, page, page_size)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<ResultId>) -> ApiResult<Json<BacktestResult>> {
    Ok(Json(state.store.get_result(id).await?))
}
