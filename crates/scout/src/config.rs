// SPDX-License-Identifier: MIT

//! Scout scheduler configuration: the tick cadence of the cron loop.
//! Mirrors `sf-scheduler::SchedulerConfig`'s "small idle poll" shape,
//! grounded on `haru0416-dev-AsteronIris`'s `MIN_POLL_SECONDS` floor.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// How often the tick loop re-reads enabled schedules and checks for
    /// due fires. Schedule CRUD takes effect on the next tick rather than
    /// waking the loop directly, which keeps the loop itself stateless
    /// between ticks.
    pub tick_interval: Duration,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self { tick_interval: Duration::from_secs(5) }
    }
}
