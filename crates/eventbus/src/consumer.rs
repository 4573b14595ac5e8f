// SPDX-License-Identifier: MIT

//! `subscribe` (spec.md §4.5): binds a server-named, non-durable queue to
//! one or more routing-key patterns on the shared topic exchange, and
//! drives a resilient consumer loop that reconnects with the backoff from
//! [`crate::config::Backoff`] on broker disconnect. Re-establishes
//! bindings on every reconnect; in-flight unacked messages are redelivered
//! by the broker per spec.md §4.5.

use crate::config::{Backoff, EventBusConfig};
use crate::error::EventBusResult;
use deadpool_lapin::Pool;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Explicit ack/nack token handed to a subscription handler (spec.md §4.5:
/// "Handler must ack or nack explicitly; unacked messages are redelivered
/// after a broker timeout").
pub struct AckToken {
    delivery: lapin::message::Delivery,
}

impl AckToken {
    pub async fn ack(self) -> EventBusResult<()> {
        self.delivery.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    /// `requeue = true` asks the broker to redeliver immediately instead of
    /// waiting out the broker's unacked-message timeout.
    pub async fn nack(self, requeue: bool) -> EventBusResult<()> {
        self.delivery.nack(BasicNackOptions { requeue, ..Default::default() }).await?;
        Ok(())
    }
}

pub type Handler = Arc<
    dyn Fn(&str, Vec<u8>, AckToken) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync,
>;

/// Cancellation handle returned by [`subscribe`]; dropping or cancelling it
/// stops the consumer loop on its next iteration.
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Subscribe `handler` to every routing key matching one of
/// `binding_patterns` (AMQP topic wildcards, e.g. `"backtest.*"`,
/// `"optimization.#"`). Spawns a background task and returns immediately.
pub async fn subscribe(
    pool: Pool,
    config: EventBusConfig,
    binding_patterns: Vec<String>,
    handler: Handler,
) -> EventBusResult<Subscription> {
    let token = CancellationToken::new();
    let task_token = token.clone();
    tokio::spawn(consume_loop(pool, config, binding_patterns, handler, task_token));
    Ok(Subscription { token })
}

async fn consume_loop(
    pool: Pool,
    config: EventBusConfig,
    binding_patterns: Vec<String>,
    handler: Handler,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new(&config);
    loop {
        if cancel.is_cancelled() {
            return;
        }
        match run_once(&pool, &config, &binding_patterns, &handler, &cancel).await {
            Ok(()) => return, // cancelled cleanly
            Err(err) => {
                let delay = backoff.next();
                tracing::warn!(error = %err, delay_ms = delay.as_millis(), "event bus consumer disconnected, reconnecting");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return,
                }
            }
        }
    }
}

async fn run_once(
    pool: &Pool,
    config: &EventBusConfig,
    binding_patterns: &[String],
    handler: &Handler,
    cancel: &CancellationToken,
) -> EventBusResult<()> {
    let conn = pool.get().await?;
    let channel = conn.create_channel().await?;

    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions { exclusive: true, auto_delete: true, ..Default::default() },
            FieldTable::default(),
        )
        .await?;
    let queue_name = queue.name().as_str();

    for pattern in binding_patterns {
        channel
            .queue_bind(queue_name, &config.exchange, pattern, QueueBindOptions::default(), FieldTable::default())
            .await?;
    }

    let mut consumer = channel
        .basic_consume(queue_name, "sf-eventbus", BasicConsumeOptions::default(), FieldTable::default())
        .await?;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            next = consumer.next() => {
                let Some(delivery) = next else { return Err(lapin::Error::InvalidChannel(0).into()) };
                let delivery = delivery?;
                let routing_key = delivery.routing_key.as_str().to_string();
                let body = delivery.data.clone();
                let ack = AckToken { delivery };
                (handler)(&routing_key, body, ack).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_token_wraps_a_delivery() {
        // Construction requires a real `lapin::message::Delivery`, which can
        // only come from a live channel; exercised end-to-end against a
        // broker in integration tests instead.
    }
}
