// SPDX-License-Identifier: MIT

//! HTTP/WS Request Surface (C8, spec.md §6): a thin `axum` router over
//! `sf-storage`/`sf-coordinator`/`sf-scout`, with `/ws/events` nested from
//! `sf-gateway`. Grounded on `iridite-tandem`'s `tandem-server::http`
//! router-assembly shape (`Router::new().route(...).layer(...)`), scaled
//! down from that crate's session/tool surface to this one's five
//! resources.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod parse;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Assemble the full `/api/v1` + `/ws/events` router over shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let v1 = Router::new()
        .route("/strategies", get(routes::strategies::list).post(routes::strategies::create))
        .route(
            "/strategies/{id}",
            get(routes::strategies::get).put(routes::strategies::update).delete(routes::strategies::delete),
        )
        .route("/strategies/{id}/lineage", get(routes::strategies::lineage))
        .route("/backtests", get(routes::backtests::list).post(routes::backtests::create))
        .route("/backtests/queue/stats", get(routes::backtests::queue_stats))
        .route("/backtests/{id}", get(routes::backtests::get).delete(routes::backtests::cancel))
        .route("/backtest-results", get(routes::results::list))
        .route("/backtest-results/{id}", get(routes::results::get))
        .route("/optimizations", get(routes::optimizations::list).post(routes::optimizations::create))
        .route("/optimizations/{id}", get(routes::optimizations::get))
        .route("/optimizations/{id}/control", post(routes::optimizations::control))
        .route("/agents/scout/trigger", post(routes::scout::trigger))
        .route("/agents/scout/runs", get(routes::scout::list_runs))
        .route("/agents/scout/runs/{id}", get(routes::scout::get_run).delete(routes::scout::cancel_run))
        .route(
            "/agents/scout/schedules",
            get(routes::scout::list_schedules).post(routes::scout::create_schedule),
        )
        .route(
            "/agents/scout/schedules/{id}",
            get(routes::scout::get_schedule).put(routes::scout::update_schedule).delete(routes::scout::delete_schedule),
        )
        .route("/health", get(routes::health::overall))
        .route("/health/live", get(routes::health::live))
        .route("/health/ready", get(routes::health::ready))
        .route("/metrics", get(routes::metrics::get))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", v1)
        .merge(sf_gateway::router(state.hub))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
