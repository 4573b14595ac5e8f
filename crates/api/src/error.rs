// SPDX-License-Identifier: MIT

//! Maps every error type handlers can produce onto the HTTP status table in
//! spec.md §7, via `sf_wire::ErrorResponse::from_domain` wherever the
//! failure already carries a [`sf_core::DomainError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sf_core::DomainError;
use sf_coordinator::CoordinatorError;
use sf_scheduler::SchedulerError;
use sf_scout::ScoutError;
use sf_storage::StorageError;
use sf_wire::ErrorResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Scout(#[from] ScoutError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ApiError {
    fn status_and_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::Domain(err) => from_domain(err),
            ApiError::Storage(StorageError::Domain(err)) => from_domain(err),
            ApiError::Storage(err @ StorageError::Database(_)) => dependency_unavailable(err),
            ApiError::Storage(err @ StorageError::Migration(_)) => dependency_unavailable(err),
            ApiError::Coordinator(CoordinatorError::Storage(StorageError::Domain(err))) => from_domain(err),
            ApiError::Coordinator(err @ CoordinatorError::Storage(_)) => dependency_unavailable(err),
            ApiError::Coordinator(err @ CoordinatorError::EventBus(_)) => dependency_unavailable(err),
            ApiError::Coordinator(CoordinatorError::RunNotRunning(run_id)) => (
                StatusCode::CONFLICT,
                ErrorResponse { error: format!("optimization run {run_id} is not RUNNING"), status: 409 },
            ),
            ApiError::Scout(ScoutError::Storage(StorageError::Domain(err))) => from_domain(err),
            ApiError::Scout(err @ ScoutError::Storage(_)) => dependency_unavailable(err),
            ApiError::Scout(ScoutError::InvalidCron(detail)) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse { error: format!("invalid cron expression: {detail}"), status: 400 },
            ),
            ApiError::Scheduler(SchedulerError::Storage(StorageError::Domain(err))) => from_domain(err),
            ApiError::Scheduler(err @ SchedulerError::Storage(_)) => dependency_unavailable(err),
            ApiError::Scheduler(err @ SchedulerError::EventBus(_)) => dependency_unavailable(err),
        }
    }
}

fn from_domain(err: &DomainError) -> (StatusCode, ErrorResponse) {
    let response = ErrorResponse::from_domain(err);
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response)
}

fn dependency_unavailable(err: &dyn std::error::Error) -> (StatusCode, ErrorResponse) {
    (StatusCode::SERVICE_UNAVAILABLE, ErrorResponse { error: err.to_string(), status: 503 })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_response();
        tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
