// SPDX-License-Identifier: MIT

//! Event bus failure taxonomy (spec.md §4.5, §7). Broker disconnects are
//! recovered internally by the consumer loop — this error type only
//! surfaces failures the caller must act on (a publish that could not be
//! queued, a malformed binding pattern).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("failed to connect to broker: {0}")]
    Connect(#[from] deadpool_lapin::PoolError),

    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("failed to serialize event envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type EventBusResult<T> = Result<T, EventBusError>;
