// SPDX-License-Identifier: MIT

//! Wire-level types shared between `sf-api`, `sf-gateway`, `sf-eventbus`,
//! and external consumers: the event envelope + routing-key taxonomy
//! (spec.md §4.5, §6.2), REST request/response DTOs (spec.md §6.1), and
//! domain-error-to-HTTP-status mapping (spec.md §7).

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dto;
pub mod envelope;
pub mod error;
pub mod ws;

pub use dto::*;
pub use envelope::{routing_key, AgentStatus, EventEnvelope, EventPayload, ResourceFamily};
pub use error::ErrorResponse;
pub use ws::{ClientMessage, ServerPush, SubscriptionFilter};
