// SPDX-License-Identifier: MIT

//! Bridges the durable event bus to the realtime gateway's in-process
//! [`sf_gateway::Hub`]. Grounded on `sf-scheduler`/`sf-coordinator`'s own
//! publish-failure-is-logged-not-fatal idiom: a malformed or lost envelope
//! degrades the live feed, it does not take the daemon down.

use sf_eventbus::{AckToken, EventBusConfig};
use sf_gateway::Hub;
use sf_wire::EventEnvelope;
use std::sync::Arc;

/// Bind a non-durable queue to every routing key and forward each decoded
/// envelope to `hub.broadcast`. Returns the [`sf_eventbus::Subscription`]
/// handle so the caller can cancel it on shutdown.
pub async fn spawn(
    pool: deadpool_lapin::Pool,
    config: EventBusConfig,
    hub: Hub,
) -> Result<sf_eventbus::Subscription, sf_eventbus::EventBusError> {
    let hub = Arc::new(hub);
    let handler: sf_eventbus::Handler = Arc::new(move |routing_key, body, ack: AckToken| {
        let hub = hub.clone();
        let routing_key = routing_key.to_string();
        Box::pin(async move {
            match serde_json::from_slice::<EventEnvelope>(&body) {
                Ok(envelope) => hub.broadcast(envelope),
                Err(err) => tracing::warn!(routing_key, error = %err, "dropping undecodable event on the realtime bridge"),
            }
            let _ = ack.ack().await;
        })
    });

    sf_eventbus::subscribe(pool, config, vec!["#".to_string()], handler).await
}
