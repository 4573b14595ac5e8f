// SPDX-License-Identifier: MIT

//! Trigger/cancel logic shared by manual requests (`sf-api`) and the cron
//! tick loop: enforce the at-most-one-active-run invariant (spec.md §3,
//! §4.7) and publish `scout.trigger`/`scout.cancelled`. Grounded on
//! `sf-coordinator::Coordinator`'s thin-wrapper-over-the-store shape.

use chrono::Utc;
use sf_core::{ScoutRun, ScoutRunId, TriggerType};
use sf_eventbus::EventPublisher;
use sf_storage::{Store, StorageError};
use sf_wire::{EventEnvelope, EventPayload};
use std::sync::Arc;

use crate::error::ScoutResult;

pub struct ScoutCoordinator {
    store: Arc<Store>,
    publisher: Arc<dyn EventPublisher>,
}

impl ScoutCoordinator {
    pub fn new(store: Arc<Store>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// A user- or agent-initiated trigger (spec.md §6.1 `POST
    /// /agents/scout/trigger`). Propagates `ScoutRunActive` as a hard
    /// error — `sf-api` maps it to 409, per spec.md §6.1's status table.
    pub async fn trigger_manual(&self, source: impl Into<String>, max_strategies: Option<u32>) -> ScoutResult<ScoutRun> {
        self.trigger(TriggerType::Manual, source, max_strategies).await
    }

    /// A schedule-initiated trigger (spec.md §4.7). Unlike the manual path,
    /// an active-run conflict is not an error: it is logged and dropped so
    /// the cron loop can move on to the next schedule.
    pub async fn trigger_scheduled(&self, source: impl Into<String>, max_strategies: Option<u32>) -> Option<ScoutRun> {
        let source = source.into();
        match self.trigger(TriggerType::Scheduled, source.clone(), max_strategies).await {
            Ok(run) => Some(run),
            Err(crate::error::ScoutError::Storage(StorageError::Domain(sf_core::DomainError::ScoutRunActive))) => {
                tracing::info!(source = %source, "skipped scheduled scout trigger: a run is already active");
                None
            }
            Err(err) => {
                tracing::warn!(source = %source, error = %err, "scheduled scout trigger failed");
                None
            }
        }
    }

    async fn trigger(&self, trigger_type: TriggerType, source: impl Into<String>, max_strategies: Option<u32>) -> ScoutResult<ScoutRun> {
        let now = Utc::now();
        let source = source.into();
        let run = ScoutRun::new(trigger_type, source.clone(), max_strategies, now);
        self.store.create_scout_run(&run).await?;

        self.publish(EventPayload::ScoutTrigger { run_id: run.id, source }, now).await;
        Ok(run)
    }

    /// Cancel any non-terminal scout run (spec.md §4.7).
    pub async fn cancel(&self, run_id: ScoutRunId) -> ScoutResult<ScoutRun> {
        let now = Utc::now();
        self.store.cancel_scout_run(run_id, now).await?;
        self.publish(EventPayload::ScoutCancelled { run_id }, now).await;
        Ok(self.store.get_scout_run(run_id).await?)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    async fn publish(&self, payload: EventPayload, now: chrono::DateTime<Utc>) {
        let envelope = EventEnvelope::new(payload, now);
        if let Err(err) = self.publisher.publish(&envelope).await {
            tracing::warn!(error = %err, routing_key = envelope.routing_key(), "failed to publish event");
        }
    }
}
