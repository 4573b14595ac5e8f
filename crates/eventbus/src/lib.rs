// SPDX-License-Identifier: MIT

//! Event bus (C5, spec.md §4.5): durable, asynchronous, many-to-many
//! delivery of domain events over a topic exchange. Grounded on
//! `Toasterson-akh-medu`'s feature-gated `lapin`/`deadpool-lapin` module,
//! generalized from that crate's ActivityPub fan-out to the routing-key
//! taxonomy in `sf-wire::envelope::routing_key`.
//!
//! `publish` is non-blocking from the caller's perspective and at-least-once
//! (the broker's durability, not this client's). `subscribe` returns a
//! cancellation handle and reconnects with exponential backoff on
//! disconnect, re-establishing bindings each time.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod consumer;
pub mod error;
pub mod publisher;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{Backoff, EventBusConfig};
pub use consumer::{subscribe, AckToken, Handler, Subscription};
pub use error::{EventBusError, EventBusResult};
pub use publisher::{AmqpEventBus, EventPublisher};
