// SPDX-License-Identifier: MIT

//! Optimization Coordinator (spec.md §4.4, C4): owns the run state machine
//! and the contract with external agents that produce iterations. Grounded
//! on the teacher's `oj-core`/`oj-engine` `decision.rs` transition-table
//! idiom, generalized from the teacher's single pass/fail decision to the
//! six-state run lifecycle and the four `OptimizationMode` comparators
//! `sf-core` already defines.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;

#[cfg(test)]
mod tests;

pub use error::{CoordinatorError, CoordinatorResult};

use chrono::Utc;
use sf_core::{
    is_better, ApprovalState, BacktestJob, ControlAction, IterationId, OptimizationIteration,
    ResultId, RunId, RunStatus, StrategyId,
};
use sf_eventbus::EventPublisher;
use sf_storage::Store;
use sf_wire::{EventEnvelope, EventPayload};
use std::sync::Arc;

/// Fallback reason recorded when a run completes automatically (not via an
/// explicit `complete` control action) because it hit its iteration cap.
const MAX_ITERATIONS_REASON: &str = "max_iterations reached";

pub struct Coordinator {
    store: Arc<Store>,
    publisher: Arc<dyn EventPublisher>,
}

impl Coordinator {
    pub fn new(store: Arc<Store>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Enqueue a new iteration: inserts the `OptimizationIteration` row,
    /// submits the backing `BacktestJob`, advances `current_iteration`, and
    /// auto-completes the run if the new count reaches `max_iterations`
    /// (spec.md §4.4 termination clause 1). The run must be RUNNING.
    pub async fn submit_iteration(
        &self,
        run_id: RunId,
        strategy_id: StrategyId,
        priority: i32,
        engineer_changes: Option<String>,
    ) -> CoordinatorResult<OptimizationIteration> {
        let run = self.store.get_run(run_id).await?;
        if run.status != RunStatus::Running {
            return Err(CoordinatorError::RunNotRunning(run_id));
        }

        let now = Utc::now();
        let mut job = BacktestJob::new(strategy_id, run.config.backtest.clone(), priority, now);
        job.optimization_run_id = Some(run_id);
        self.store.submit_job(&job).await?;

        let iteration_number = self.store.next_iteration_number(run_id).await?;
        let mut iteration = OptimizationIteration::new(run_id, iteration_number, strategy_id, job.id, now);
        iteration.engineer_changes = engineer_changes;
        self.store.add_iteration(&iteration).await?;
        self.store.increment_iteration_count(run_id, now).await?;

        self.publish(
            EventPayload::OptimizationIterationStarted {
                run_id,
                iteration_number,
                iteration_id: iteration.id,
                strategy_id,
            },
            now,
        )
        .await;

        let updated = self.store.get_run(run_id).await?;
        if updated.reached_max_iterations() {
            self.complete_run(run_id, MAX_ITERATIONS_REASON, now).await?;
        }

        Ok(iteration)
    }

    /// Attach a result and analyst decision to an iteration (spec.md §4.4).
    /// If `result_id` is supplied and the result is criteria-passing and
    /// better than the run's current incumbent under its `OptimizationMode`,
    /// the best-pair is atomically updated and `optimization.new_best` is
    /// published alongside `optimization.iteration.completed`.
    pub async fn record_feedback(
        &self,
        iteration_id: IterationId,
        result_id: Option<ResultId>,
        feedback: Option<&str>,
        approval: ApprovalState,
    ) -> CoordinatorResult<OptimizationIteration> {
        self.store
            .update_iteration_feedback(iteration_id, result_id, feedback, approval)
            .await?;
        let iteration = self.store.get_iteration(iteration_id).await?;

        let Some(result_id) = result_id else {
            return Ok(iteration);
        };

        let run = self.store.get_run(iteration.run_id).await?;
        let candidate = self.store.get_result(result_id).await?;
        let now = Utc::now();

        let incumbent_metrics = match run.best_result_id {
            Some(best_id) => Some(self.store.get_result(best_id).await?.metrics),
            None => None,
        };
        let is_best = match &incumbent_metrics {
            Some(incumbent) => is_better(run.config.mode, &run.config.criteria, incumbent, &candidate.metrics),
            None => run.config.criteria.passes(&candidate.metrics),
        };

        if is_best {
            self.store.set_best(run.id, candidate.strategy_id, result_id, now).await?;
            self.publish(
                EventPayload::OptimizationNewBest {
                    run_id: run.id,
                    iteration_number: iteration.iteration_number,
                    strategy_id: candidate.strategy_id,
                    result_id,
                },
                now,
            )
            .await;
        }

        self.publish(
            EventPayload::OptimizationIterationCompleted {
                run_id: run.id,
                iteration_number: iteration.iteration_number,
                iteration_id: iteration.id,
                strategy_id: iteration.strategy_id,
                result_id,
                is_best,
            },
            now,
        )
        .await;

        Ok(iteration)
    }

    /// Apply an externally-requested control action (spec.md §4.4:
    /// `pause|resume|cancel|complete|fail`). `reason` is only recorded when
    /// the resulting status is terminal; the routing taxonomy only defines
    /// events for COMPLETED and FAILED outcomes, so pause/resume/cancel are
    /// silent on the bus.
    pub async fn control(
        &self,
        run_id: RunId,
        action: ControlAction,
        reason: Option<&str>,
    ) -> CoordinatorResult<sf_core::OptimizationRun> {
        let now = Utc::now();
        let run = self.store.run_state_update(run_id, action, reason, now).await?;
        match run.status {
            RunStatus::Completed => {
                self.publish(
                    EventPayload::OptimizationCompleted {
                        run_id,
                        iteration_number: run.current_iteration,
                        termination_reason: run.termination_reason.clone().unwrap_or_default(),
                    },
                    now,
                )
                .await;
            }
            RunStatus::Failed => {
                self.publish(
                    EventPayload::OptimizationFailed {
                        run_id,
                        iteration_number: run.current_iteration,
                        termination_reason: run.termination_reason.clone().unwrap_or_default(),
                    },
                    now,
                )
                .await;
            }
            _ => {}
        }
        Ok(run)
    }

    async fn complete_run(&self, run_id: RunId, reason: &str, now: chrono::DateTime<Utc>) -> CoordinatorResult<()> {
        let run = self.store.run_state_update(run_id, ControlAction::Complete, Some(reason), now).await?;
        self.publish(
            EventPayload::OptimizationCompleted {
                run_id,
                iteration_number: run.current_iteration,
                termination_reason: reason.to_string(),
            },
            now,
        )
        .await;
        Ok(())
    }

    async fn publish(&self, payload: EventPayload, now: chrono::DateTime<Utc>) {
        let envelope = EventEnvelope::new(payload, now);
        if let Err(err) = self.publisher.publish(&envelope).await {
            tracing::warn!(error = %err, routing_key = envelope.routing_key(), "failed to publish event");
        }
    }
}
