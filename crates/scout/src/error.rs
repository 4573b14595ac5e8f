// SPDX-License-Identifier: MIT

//! Scout scheduler failures (spec.md §4.7). Mirrors `sf-coordinator`'s
//! error shape: a thin wrapper over [`sf_storage::StorageError`] plus a
//! cron-expression parse failure, which only ever surfaces from schedule
//! CRUD (a bad expression is rejected before it reaches the tick loop).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error(transparent)]
    Storage(#[from] sf_storage::StorageError),

    #[error("invalid cron expression: {0}")]
    InvalidCron(String),
}

pub type ScoutResult<T> = Result<T, ScoutError>;
