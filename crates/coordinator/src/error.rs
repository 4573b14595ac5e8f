// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Storage(#[from] sf_storage::StorageError),

    #[error(transparent)]
    EventBus(#[from] sf_eventbus::EventBusError),

    #[error("optimization run {0} is not RUNNING")]
    RunNotRunning(sf_core::RunId),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
