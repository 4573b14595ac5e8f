// SPDX-License-Identifier: MIT

//! Realtime gateway client protocol (spec.md §4.6): the subscribe/
//! unsubscribe filter messages a WebSocket client may send, and the
//! outbound push envelope the server wraps each event in.

use crate::envelope::{EventEnvelope, ResourceFamily};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound control message on `/ws/events`. An empty or absent `event_types`
/// filter means "all events" (spec.md §4.6).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        #[serde(default)]
        event_types: Vec<String>,
    },
    Unsubscribe {
        #[serde(default)]
        event_types: Vec<String>,
    },
}

/// Outbound push: one per event, JSON-serialized (spec.md §4.6: "Server
/// pushes one message per event"). Multiple queued pushes may be
/// newline-joined into a single WS frame by the hub; each line parses as
/// this shape independently.
#[derive(Debug, Clone, Serialize)]
pub struct ServerPush<'a> {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub data: &'a EventEnvelope,
    pub timestamp: DateTime<Utc>,
}

impl<'a> ServerPush<'a> {
    pub fn new(envelope: &'a EventEnvelope) -> Self {
        Self { event_type: envelope.routing_key(), data: envelope, timestamp: envelope.timestamp }
    }
}

/// A client's subscription filter: by resource family, optionally narrowed
/// to event-type prefixes it has explicitly asked for (spec.md §4.6:
/// "Clients subscribe by resource, by specific ids... and optionally by
/// change kind"). An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    event_types: std::collections::HashSet<String>,
}

impl SubscriptionFilter {
    pub fn add(&mut self, event_types: &[String]) {
        self.event_types.extend(event_types.iter().cloned());
    }

    pub fn remove(&mut self, event_types: &[String]) {
        for t in event_types {
            self.event_types.remove(t);
        }
    }

    /// Whether this filter passes `event_type`. An empty filter means "all
    /// events"; otherwise matches an exact event type or its resource-family
    /// prefix (e.g. a client that asked for `"backtest"` sees every
    /// `backtest.*` event, matching the client-side routing rule in §4.6).
    pub fn matches(&self, event_type: &str) -> bool {
        if self.event_types.is_empty() {
            return true;
        }
        if self.event_types.contains(event_type) {
            return true;
        }
        match ResourceFamily::from_event_type(event_type) {
            Some(family) => self.event_types.iter().any(|f| f.eq_ignore_ascii_case(family_name(family))),
            None => false,
        }
    }
}

fn family_name(family: ResourceFamily) -> &'static str {
    match family {
        ResourceFamily::Backtest => "backtest",
        ResourceFamily::Optimization => "optimization",
        ResourceFamily::Strategy => "strategy",
        ResourceFamily::Agent => "agent",
        ResourceFamily::Scout => "scout",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EventPayload;
    use sf_core::{JobId, StrategyId};

    #[test]
    fn empty_filter_matches_everything() {
        let filter = SubscriptionFilter::default();
        assert!(filter.matches("backtest.completed"));
    }

    #[test]
    fn filter_matches_exact_type_and_resource_prefix() {
        let mut filter = SubscriptionFilter::default();
        filter.add(&["optimization.new_best".to_string()]);
        assert!(filter.matches("optimization.new_best"));
        assert!(!filter.matches("backtest.completed"));

        filter.add(&["backtest".to_string()]);
        assert!(filter.matches("backtest.completed"));
        assert!(filter.matches("backtest.failed"));
    }

    #[test]
    fn unsubscribe_removes_a_previously_added_filter() {
        let mut filter = SubscriptionFilter::default();
        filter.add(&["backtest".to_string()]);
        filter.remove(&["backtest".to_string()]);
        filter.add(&["optimization.new_best".to_string()]);
        assert!(!filter.matches("backtest.completed"));
    }

    #[test]
    fn server_push_carries_the_routing_key_as_its_type() {
        let envelope = EventEnvelope::new(
            EventPayload::BacktestSubmitted { job_id: JobId::new(), strategy_id: StrategyId::new() },
            Utc::now(),
        );
        let push = ServerPush::new(&envelope);
        assert_eq!(push.event_type, "backtest.submitted");
    }
}
