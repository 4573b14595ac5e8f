// SPDX-License-Identifier: MIT

//! Scheduler observability (spec.md §4.3: "the scheduler provides
//! observability... so upstream can self-throttle"). In-process worker
//! occupancy is tracked here; queue depth and moving averages are computed
//! by `sf-storage::queue_stats` from durable state.

use sf_core::QueueStats;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct SchedulerMetrics {
    active_workers: AtomicUsize,
}

impl SchedulerMetrics {
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Relaxed)
    }

    pub(crate) fn worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn worker_finished(&self) {
        self.active_workers.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Snapshot combining in-process occupancy with the durable queue depth and
/// wait/run moving averages, for `/backtests/queue/stats` and `/metrics`.
#[derive(Debug, Clone, Default)]
pub struct SchedulerSnapshot {
    pub queue: QueueStats,
    pub active_workers: usize,
    pub worker_count: usize,
}
