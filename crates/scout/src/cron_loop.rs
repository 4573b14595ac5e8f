// SPDX-License-Identifier: MIT

//! The cron tick loop (spec.md §4.7): "a single goroutine-style ticker
//! maintains the next-fire times, reloaded on schedule create/update/
//! delete/toggle." Grounded on `haru0416-dev-AsteronIris`'s
//! `platform::cron::scheduler::run` shape (`tokio::time::interval` +
//! due-jobs scan); reload is implicit here since every tick re-reads
//! `list_enabled_scout_schedules` from the store rather than caching a
//! schedule set in memory, so CRUD against the store takes effect on the
//! very next tick with no separate invalidation signal needed.

use crate::coordinator::ScoutCoordinator;
use chrono::Utc;
use cron::Schedule;
use sf_core::ScoutSchedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(coordinator: Arc<ScoutCoordinator>, tick_interval: std::time::Duration, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(tick_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.cancelled() => return,
        }

        let schedules = match coordinator.store().list_enabled_scout_schedules().await {
            Ok(schedules) => schedules,
            Err(err) => {
                tracing::error!(error = %err, "failed to load scout schedules");
                continue;
            }
        };

        for schedule in schedules {
            if let Err(err) = tick_one(&coordinator, &schedule).await {
                tracing::warn!(schedule_id = %schedule.id, error = %err, "failed to evaluate scout schedule");
            }
        }
    }
}

async fn tick_one(coordinator: &ScoutCoordinator, schedule: &ScoutSchedule) -> Result<(), crate::error::ScoutError> {
    let parsed = Schedule::from_str(&schedule.cron_expression)
        .map_err(|e| crate::error::ScoutError::InvalidCron(e.to_string()))?;
    let now = Utc::now();

    let due = match schedule.next_run_at {
        Some(next) => now >= next,
        // Never fired before: due immediately so a freshly-enabled
        // schedule does not wait a full period before its first run.
        None => true,
    };

    if !due {
        return Ok(());
    }

    coordinator.trigger_scheduled(schedule.source.clone(), schedule.max_strategies).await;

    let next_run_at = parsed.after(&now).next();
    coordinator
        .store()
        .record_scout_schedule_fired(schedule.id, next_run_at, now)
        .await?;
    Ok(())
}
