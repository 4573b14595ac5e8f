// SPDX-License-Identifier: MIT

//! `/health`, `/health/live`, `/health/ready` (spec.md §6.1).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sf_wire::{HealthReport, HealthState};
use std::collections::BTreeMap;

use crate::state::AppState;

/// Always 200: the process is up and able to respond, regardless of its
/// dependencies (spec.md §7's "non-retriable" split assumes a caller can
/// tell liveness from readiness apart).
pub async fn live() -> Json<HealthReport> {
    let mut components = BTreeMap::new();
    components.insert("process".to_string(), HealthState::Ok);
    Json(HealthReport { status: HealthState::Ok, components })
}

/// Checks the database connection; 503 when it's unreachable (spec.md §7
/// Dependency kind).
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = build_report(&state).await;
    let status = match report.status {
        HealthState::Ok => StatusCode::OK,
        HealthState::Degraded => StatusCode::OK,
        HealthState::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}

pub async fn overall(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    ready(State(state)).await
}

async fn build_report(state: &AppState) -> HealthReport {
    let mut components = BTreeMap::new();

    let database = match sqlx::query("SELECT 1").execute(state.store.pool()).await {
        Ok(_) => HealthState::Ok,
        Err(err) => {
            tracing::warn!(error = %err, "database health check failed");
            HealthState::Unavailable
        }
    };
    components.insert("database".to_string(), database);

    let active_scout_run = match state.scout.store().get_active_scout_run().await {
        Ok(_) => HealthState::Ok,
        Err(err) => {
            tracing::warn!(error = %err, "scout health check failed");
            HealthState::Degraded
        }
    };
    components.insert("scout".to_string(), active_scout_run);

    let status = if components.values().any(|s| *s == HealthState::Unavailable) {
        HealthState::Unavailable
    } else if components.values().any(|s| *s == HealthState::Degraded) {
        HealthState::Degraded
    } else {
        HealthState::Ok
    };

    HealthReport { status, components }
}
