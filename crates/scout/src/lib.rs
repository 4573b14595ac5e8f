// SPDX-License-Identifier: MIT

//! Scout Scheduler (C7, spec.md §4.7): cron-driven recurring triggers with
//! an at-most-one-active-run invariant per source, enforced in
//! `sf-storage` by a partial unique index and surfaced here as
//! `DomainError::ScoutRunActive`. Grounded on the teacher's own cron
//! feature (`oj-engine::runtime::handlers::cron`, interval-timer based)
//! for the "one task owns the schedule state" shape, enriched with the
//! `cron` crate for real cron-expression parsing and
//! `haru0416-dev-AsteronIris`'s tick-loop structure.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod coordinator;
pub mod cron_loop;
pub mod error;

#[cfg(test)]
mod tests;

pub use config::ScoutConfig;
pub use coordinator::ScoutCoordinator;
pub use error::{ScoutError, ScoutResult};

use sf_eventbus::EventPublisher;
use sf_storage::Store;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on how long [`ScoutScheduler::shutdown`] waits for the tick
/// loop to observe cancellation (spec.md §5's 30s shutdown deadline,
/// applied uniformly across background tasks).
const SHUTDOWN_DEADLINE: std::time::Duration = std::time::Duration::from_secs(30);

/// Owns the background cron tick task and exposes the manual trigger/
/// cancel surface `sf-api` calls into.
pub struct ScoutScheduler {
    coordinator: Arc<ScoutCoordinator>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ScoutScheduler {
    pub fn spawn(store: Arc<Store>, publisher: Arc<dyn EventPublisher>, config: ScoutConfig) -> Self {
        let coordinator = Arc::new(ScoutCoordinator::new(store, publisher));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(cron_loop::run(coordinator.clone(), config.tick_interval, shutdown.clone()));
        Self { coordinator, shutdown, task }
    }

    pub fn coordinator(&self) -> &Arc<ScoutCoordinator> {
        &self.coordinator
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if tokio::time::timeout(SHUTDOWN_DEADLINE, self.task).await.is_err() {
            tracing::warn!("scout scheduler shutdown deadline elapsed with the tick loop still running");
        }
    }
}
