// SPDX-License-Identifier: MIT

//! Shared application state (spec.md §6, C8). Deliberately does not hold
//! the full [`sf_scheduler::Scheduler`]: its `shutdown` consumes `self`, so
//! `sf-daemon` keeps ownership of it and hands the request surface only the
//! parts handlers actually need.

use sf_coordinator::Coordinator;
use sf_gateway::Hub;
use sf_scheduler::SchedulerMetrics;
use sf_scout::ScoutCoordinator;
use sf_storage::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub coordinator: Arc<Coordinator>,
    pub scout: Arc<ScoutCoordinator>,
    pub scheduler_metrics: Arc<SchedulerMetrics>,
    pub hub: Hub,
}
