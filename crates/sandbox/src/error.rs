// SPDX-License-Identifier: MIT

//! Executor-side failure taxonomy (spec.md §7): these never cross the
//! request surface, they are recorded as the `error` column on the job row
//! by the worker that invoked the backend.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox exceeded its wall-clock timeout")]
    Timeout,

    #[error("sandbox was cancelled")]
    Cancelled,

    #[error("executor failure: {0}")]
    Executor(String),

    #[error("failed to parse backtest report: {0}")]
    Parse(String),

    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SandboxResult<T> = Result<T, SandboxError>;
