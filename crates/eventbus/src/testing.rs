// SPDX-License-Identifier: MIT

//! An in-memory [`EventPublisher`] fake for other crates' unit tests —
//! `sf-scheduler`, `sf-coordinator`, and `sf-scout` all assert on published
//! events without standing up a broker.

use crate::error::EventBusResult;
use crate::publisher::EventPublisher;
use async_trait::async_trait;
use parking_lot::Mutex;
use sf_wire::EventEnvelope;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<EventEnvelope> {
        self.events.lock().clone()
    }

    pub fn routing_keys(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.routing_key()).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> EventBusResult<()> {
        self.events.lock().push(envelope.clone());
        Ok(())
    }
}
