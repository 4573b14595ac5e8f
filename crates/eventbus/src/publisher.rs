// SPDX-License-Identifier: MIT

//! `publish` (spec.md §4.5): non-blocking from the caller's perspective,
//! at-least-once delivery via a durable topic exchange. Grounded on
//! `Toasterson-akh-medu`'s feature-gated `lapin`/`deadpool-lapin` module:
//! a pooled connection, publish-confirms left to the broker's durability
//! guarantees rather than awaited per-message (the at-least-once contract
//! is the broker's, not this client's).

use crate::config::EventBusConfig;
use crate::error::{EventBusError, EventBusResult};
use async_trait::async_trait;
use deadpool_lapin::{Config as PoolConfig, Pool, Runtime};
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, ExchangeKind};
use sf_wire::EventEnvelope;

/// Anything that can publish an envelope, so `sf-scheduler`/`sf-coordinator`/
/// `sf-scout` depend on this trait rather than the AMQP client directly
/// (easing unit tests with an in-memory fake).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: &EventEnvelope) -> EventBusResult<()>;
}

/// Pooled AMQP publisher backed by `deadpool-lapin`.
pub struct AmqpEventBus {
    pool: Pool,
    exchange: String,
}

impl AmqpEventBus {
    pub async fn connect(config: &EventBusConfig) -> EventBusResult<Self> {
        let pool_config = PoolConfig { url: Some(config.amqp_url.clone()), ..Default::default() };
        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| EventBusError::Amqp(lapin::Error::IOError(std::sync::Arc::new(
                std::io::Error::other(e.to_string()),
            ))))?;

        let bus = Self { pool, exchange: config.exchange.clone() };
        bus.declare_exchange().await?;
        Ok(bus)
    }

    /// The pooled connection handle, for callers that need to drive
    /// [`crate::consumer::subscribe`] directly (e.g. `sf-daemon`'s bridge
    /// from the event bus to the realtime gateway's `Hub`).
    pub fn pool(&self) -> deadpool_lapin::Pool {
        self.pool.clone()
    }

    pub fn config_exchange(&self) -> &str {
        &self.exchange
    }

    async fn declare_exchange(&self) -> EventBusResult<()> {
        let conn = self.pool.get().await?;
        let channel = conn.create_channel().await?;
        channel
            .exchange_declare(
                &self.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for AmqpEventBus {
    async fn publish(&self, envelope: &EventEnvelope) -> EventBusResult<()> {
        let body = serde_json::to_vec(envelope)?;
        let routing_key = envelope.routing_key();
        let conn = self.pool.get().await?;
        let channel = conn.create_channel().await?;
        channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_delivery_mode(2).with_content_type("application/json".into()),
            )
            .await?;
        tracing::debug!(routing_key, event_id = %envelope.event_id, "published event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPublisher;
    use sf_wire::EventPayload;

    #[tokio::test]
    async fn recording_publisher_captures_events_in_order() {
        let publisher = RecordingPublisher::default();
        let a = EventEnvelope::new(
            EventPayload::BacktestSubmitted {
                job_id: sf_core::JobId::new(),
                strategy_id: sf_core::StrategyId::new(),
            },
            chrono::Utc::now(),
        );
        publisher.publish(&a).await.unwrap();
        assert_eq!(publisher.published().len(), 1);
        assert_eq!(publisher.published()[0].event_id, a.event_id);
    }
}
