// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Storage(#[from] sf_storage::StorageError),

    #[error(transparent)]
    EventBus(#[from] sf_eventbus::EventBusError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
