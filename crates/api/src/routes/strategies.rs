// SPDX-License-Identifier: MIT

//! `/strategies` (spec.md §6.1).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sf_core::{LineageNode, Page, Strategy, StrategyId, StrategyQuery, StrategyWithBest};
use sf_wire::{CreateStrategyRequest, LineageQuery, StrategyListQuery, UpdateStrategyRequest};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateStrategyRequest>,
) -> ApiResult<(StatusCode, Json<Strategy>)> {
    let now = Utc::now();
    let mut strategy = match req.parent_id {
        Some(parent_id) => {
            let parent = state.store.get_strategy(parent_id).await?;
            Strategy::new_child(req.name, req.code, parent_id, parent.generation, now)
        }
        None => Strategy::new_root(req.name, req.code, now),
    };
    if let Some(description) = req.description {
        strategy.metadata = serde_json::json!({ "description": description });
    }
    state.store.submit_strategy(&strategy).await?;
    Ok((StatusCode::CREATED, Json(strategy)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<StrategyListQuery>,
) -> ApiResult<Json<Page<StrategyWithBest>>> {
    let query = StrategyQuery {
        name_pattern: q.name_pattern,
        min_sharpe: q.min_sharpe,
        min_profit_pct: q.min_profit_pct,
        max_drawdown_pct: q.max_drawdown_pct,
        min_trades: q.min_trades,
        order_by: q.order_by,
        ascending: q.ascending.unwrap_or(true),
        page: q.page.unwrap_or(1),
        page_size: q.page_size.unwrap_or(20),
    };
    Ok(Json(state.store.search_strategies(&query).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<StrategyId>) -> ApiResult<Json<Strategy>> {
    Ok(Json(state.store.get_strategy(id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<StrategyId>,
    Json(req): Json<UpdateStrategyRequest>,
) -> ApiResult<Json<Strategy>> {
    let now = Utc::now();
    state.store.update_strategy(id, &req.name, req.description.as_deref(), now).await?;
    Ok(Json(state.store.get_strategy(id).await?))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<StrategyId>) -> ApiResult<StatusCode> {
    state.store.delete_strategy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn lineage(
    State(state): State<AppState>,
    Path(id): Path<StrategyId>,
    Query(q): Query<LineageQuery>,
) -> ApiResult<Json<LineageNode>> {
    Ok(Json(state.store.get_lineage(id, q.depth.unwrap_or(0)).await?))
}
