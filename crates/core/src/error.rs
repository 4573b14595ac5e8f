// SPDX-License-Identifier: MIT

//! Domain error taxonomy shared across the workspace.
//!
//! Mirrors the error kinds from spec.md §7: `Validation`, `NotFound`,
//! `Conflict`, `Dependency`, `Internal`. Sandbox-specific failures
//! (`JobTimeout`/`ExecutorError`/`ParseError`) live in `sf-sandbox` since
//! they never cross the request surface — they are recorded on the job row
//! instead.

use thiserror::Error;

/// A domain-level failure, independent of its eventual wire representation.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("duplicate {entity}: {detail}")]
    Duplicate { entity: &'static str, detail: String },

    #[error("resource in use: {0}")]
    ResourceInUse(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("job {0} is already running")]
    JobAlreadyRunning(String),

    #[error("job {0} is not cancellable from its current state")]
    JobNotCancellable(String),

    #[error("optimization run {0} is not in a runnable state")]
    OptimizationNotRunning(String),

    #[error("a scout run is already active")]
    ScoutRunActive,

    #[error("dependency unavailable: {0}")]
    Dependency(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Coarse-grained kind, used by `sf-api` to choose an HTTP status.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Duplicate { .. }
            | DomainError::ResourceInUse(_)
            | DomainError::InvalidTransition(_)
            | DomainError::JobAlreadyRunning(_)
            | DomainError::JobNotCancellable(_)
            | DomainError::OptimizationNotRunning(_)
            | DomainError::ScoutRunActive => ErrorKind::Conflict,
            DomainError::Dependency(_) => ErrorKind::Dependency,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Coarse error classification, used to pick an HTTP status code and to
/// decide whether a caller may safely retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Dependency,
    Internal,
}

impl ErrorKind {
    /// HTTP status code per spec.md §7.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Dependency => 503,
            ErrorKind::Internal => 500,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
