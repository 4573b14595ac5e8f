// SPDX-License-Identifier: MIT

//! Event envelope and routing-key taxonomy (spec.md §4.5, §6.2).
//!
//! Every message published on the event bus and fanned out over the
//! realtime gateway shares this envelope shape: a unique `event_id`, a
//! dot-separated `event_type` that doubles as the AMQP routing key, an
//! ISO-8601 `timestamp`, and event-family-specific fields folded in via
//! `#[serde(flatten)]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_core::{IterationId, JobId, ResultId, RunId, ScoutRunId, StrategyId};
use uuid::Uuid;

/// Dot-separated routing keys, most-specific last (spec.md §4.5).
pub mod routing_key {
    pub const BACKTEST_SUBMITTED: &str = "backtest.submitted";
    pub const BACKTEST_COMPLETED: &str = "backtest.completed";
    pub const BACKTEST_FAILED: &str = "backtest.failed";

    pub const OPTIMIZATION_ITERATION_STARTED: &str = "optimization.iteration.started";
    pub const OPTIMIZATION_ITERATION_COMPLETED: &str = "optimization.iteration.completed";
    pub const OPTIMIZATION_NEW_BEST: &str = "optimization.new_best";
    pub const OPTIMIZATION_COMPLETED: &str = "optimization.completed";
    pub const OPTIMIZATION_FAILED: &str = "optimization.failed";

    pub const STRATEGY_DISCOVERED: &str = "strategy.discovered";
    pub const STRATEGY_NEEDS_PROCESSING: &str = "strategy.needs_processing";
    pub const STRATEGY_READY_FOR_BACKTEST: &str = "strategy.ready_for_backtest";
    pub const STRATEGY_APPROVED: &str = "strategy.approved";
    pub const STRATEGY_EVOLVE: &str = "strategy.evolve";
    pub const STRATEGY_ARCHIVED: &str = "strategy.archived";

    pub const AGENT_STATUS_CHANGED: &str = "agent.status.changed";

    pub const SCOUT_TRIGGER: &str = "scout.trigger";
    pub const SCOUT_CANCELLED: &str = "scout.cancelled";
}

/// The resource family a routing key belongs to, used by the realtime
/// gateway to map `event_type` prefixes onto client subscription filters
/// (spec.md §4.6: `optimization.*` → optimizations, `backtest.*` →
/// backtests, `agent.*` → agents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFamily {
    Backtest,
    Optimization,
    Strategy,
    Agent,
    Scout,
}

impl ResourceFamily {
    /// Derive the resource family from an `event_type`'s prefix.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        let prefix = event_type.split('.').next()?;
        match prefix {
            "backtest" => Some(Self::Backtest),
            "optimization" => Some(Self::Optimization),
            "strategy" => Some(Self::Strategy),
            "agent" => Some(Self::Agent),
            "scout" => Some(Self::Scout),
            _ => None,
        }
    }
}

/// Agent lifecycle status carried by `agent.status.changed` (spec.md §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Running,
    Stopped,
    Error,
}

/// Event-family-specific payload, flattened into [`EventEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventPayload {
    #[serde(rename = "backtest.submitted")]
    BacktestSubmitted { job_id: JobId, strategy_id: StrategyId },
    #[serde(rename = "backtest.completed")]
    BacktestCompleted {
        job_id: JobId,
        strategy_id: StrategyId,
        result_id: ResultId,
        sharpe_ratio: f64,
        profit_pct: f64,
        total_trades: u32,
    },
    #[serde(rename = "backtest.failed")]
    BacktestFailed { job_id: JobId, strategy_id: StrategyId, error: String },

    #[serde(rename = "optimization.iteration.started")]
    OptimizationIterationStarted {
        run_id: RunId,
        iteration_number: u32,
        iteration_id: IterationId,
        strategy_id: StrategyId,
    },
    #[serde(rename = "optimization.iteration.completed")]
    OptimizationIterationCompleted {
        run_id: RunId,
        iteration_number: u32,
        iteration_id: IterationId,
        strategy_id: StrategyId,
        result_id: ResultId,
        is_best: bool,
    },
    #[serde(rename = "optimization.new_best")]
    OptimizationNewBest {
        run_id: RunId,
        iteration_number: u32,
        strategy_id: StrategyId,
        result_id: ResultId,
    },
    #[serde(rename = "optimization.completed")]
    OptimizationCompleted { run_id: RunId, iteration_number: u32, termination_reason: String },
    #[serde(rename = "optimization.failed")]
    OptimizationFailed { run_id: RunId, iteration_number: u32, termination_reason: String },

    #[serde(rename = "agent.status.changed")]
    AgentStatusChanged { agent_id: String, status: AgentStatus },

    #[serde(rename = "scout.trigger")]
    ScoutTrigger { run_id: ScoutRunId, source: String },
    #[serde(rename = "scout.cancelled")]
    ScoutCancelled { run_id: ScoutRunId },
}

impl EventPayload {
    /// The dot-separated routing key for this payload (matches its serde tag).
    pub fn routing_key(&self) -> &'static str {
        match self {
            Self::BacktestSubmitted { .. } => routing_key::BACKTEST_SUBMITTED,
            Self::BacktestCompleted { .. } => routing_key::BACKTEST_COMPLETED,
            Self::BacktestFailed { .. } => routing_key::BACKTEST_FAILED,
            Self::OptimizationIterationStarted { .. } => {
                routing_key::OPTIMIZATION_ITERATION_STARTED
            }
            Self::OptimizationIterationCompleted { .. } => {
                routing_key::OPTIMIZATION_ITERATION_COMPLETED
            }
            Self::OptimizationNewBest { .. } => routing_key::OPTIMIZATION_NEW_BEST,
            Self::OptimizationCompleted { .. } => routing_key::OPTIMIZATION_COMPLETED,
            Self::OptimizationFailed { .. } => routing_key::OPTIMIZATION_FAILED,
            Self::AgentStatusChanged { .. } => routing_key::AGENT_STATUS_CHANGED,
            Self::ScoutTrigger { .. } => routing_key::SCOUT_TRIGGER,
            Self::ScoutCancelled { .. } => routing_key::SCOUT_CANCELLED,
        }
    }

    /// The resource family this payload's event belongs to (spec.md §4.6).
    pub fn resource_family(&self) -> ResourceFamily {
        ResourceFamily::from_event_type(self.routing_key())
            .expect("every EventPayload variant maps to a known resource family")
    }
}

/// The wire envelope published on the bus and fanned out to WS clients
/// (spec.md §6.2). `event_id` is unique per publish (testable property 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl EventEnvelope {
    pub fn new(payload: EventPayload, now: DateTime<Utc>) -> Self {
        Self { event_id: Uuid::new_v4(), timestamp: now, payload }
    }

    pub fn routing_key(&self) -> &'static str {
        self.payload.routing_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_family_from_prefix() {
        assert_eq!(ResourceFamily::from_event_type("backtest.completed"), Some(ResourceFamily::Backtest));
        assert_eq!(ResourceFamily::from_event_type("optimization.new_best"), Some(ResourceFamily::Optimization));
        assert_eq!(ResourceFamily::from_event_type("scout.trigger"), Some(ResourceFamily::Scout));
        assert_eq!(ResourceFamily::from_event_type("unknown.thing"), None);
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let env = EventEnvelope::new(
            EventPayload::BacktestSubmitted { job_id: JobId::new(), strategy_id: StrategyId::new() },
            Utc::now(),
        );
        let json = serde_json::to_string(&env).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_id, env.event_id);
        assert_eq!(back.routing_key(), "backtest.submitted");
    }

    #[test]
    fn each_envelope_gets_a_unique_event_id() {
        let a = EventEnvelope::new(EventPayload::ScoutCancelled { run_id: ScoutRunId::new() }, Utc::now());
        let b = EventEnvelope::new(EventPayload::ScoutCancelled { run_id: ScoutRunId::new() }, Utc::now());
        assert_ne!(a.event_id, b.event_id);
    }
}
