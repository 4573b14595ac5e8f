// SPDX-License-Identifier: MIT

//! `/metrics` (spec.md §6.1: "scheduler + store + hub counters").

use axum::extract::State;
use axum::Json;
use sf_wire::MetricsReport;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn get(State(state): State<AppState>) -> ApiResult<Json<MetricsReport>> {
    let queue = state.store.queue_stats().await?;
    let active_scout_run = state.scout.store().get_active_scout_run().await?.is_some();
    Ok(Json(MetricsReport {
        pending_jobs: queue.pending_jobs,
        running_jobs: queue.running_jobs,
        avg_wait_ms: queue.avg_wait_ms,
        avg_run_ms: queue.avg_run_ms,
        hub_connected_clients: state.hub.connected_count().await as u64,
        active_scout_run,
    }))
}
