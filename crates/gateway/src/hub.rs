// SPDX-License-Identifier: MIT

//! The registry actor (spec.md §4.6: "a single coordinator task owns a
//! registry of clients; registration, unregistration, and broadcast are
//! serialized through channels"). Grounded on `iridite-tandem`'s
//! single-task-owns-shared-state shape (`tandem-server::http`'s PTY stream
//! handling), generalized from one socket per session to a fan-out
//! registry shared by every connected client.

use sf_wire::{EventEnvelope, ServerPush, SubscriptionFilter};
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Bounded per-client outbound buffer (spec.md §4.6): a slow client is
/// disconnected rather than allowed to apply backpressure to the hub.
pub const CLIENT_BUFFER: usize = 256;

pub type ClientId = Uuid;

enum Command {
    Register { id: ClientId, sender: mpsc::Sender<String> },
    Unregister { id: ClientId },
    AddFilter { id: ClientId, event_types: Vec<String> },
    RemoveFilter { id: ClientId, event_types: Vec<String> },
    Broadcast { envelope: EventEnvelope },
    ConnectedCount { reply: tokio::sync::oneshot::Sender<usize> },
}

struct ClientEntry {
    sender: mpsc::Sender<String>,
    filter: SubscriptionFilter,
}

/// A cheaply-cloneable handle to the registry actor. All mutation goes
/// through the actor's single task; this type only ever sends commands.
#[derive(Clone)]
pub struct Hub {
    tx: mpsc::UnboundedSender<Command>,
}

impl Hub {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self { tx }
    }

    pub fn register(&self, id: ClientId, sender: mpsc::Sender<String>) {
        let _ = self.tx.send(Command::Register { id, sender });
    }

    pub fn unregister(&self, id: ClientId) {
        let _ = self.tx.send(Command::Unregister { id });
    }

    /// Widen a client's subscription (spec.md §4.6 `subscribe`). An empty
    /// `event_types` keeps the filter matching everything.
    pub fn add_filter(&self, id: ClientId, event_types: &[String]) {
        let _ = self.tx.send(Command::AddFilter { id, event_types: event_types.to_vec() });
    }

    /// Narrow a client's subscription (spec.md §4.6 `unsubscribe`).
    pub fn remove_filter(&self, id: ClientId, event_types: &[String]) {
        let _ = self.tx.send(Command::RemoveFilter { id, event_types: event_types.to_vec() });
    }

    pub fn broadcast(&self, envelope: EventEnvelope) {
        let _ = self.tx.send(Command::Broadcast { envelope });
    }

    pub async fn connected_count(&self) -> usize {
        let (reply, rx) = tokio::sync::oneshot::channel();
        if self.tx.send(Command::ConnectedCount { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut clients: HashMap<ClientId, ClientEntry> = HashMap::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Register { id, sender } => {
                clients.insert(id, ClientEntry { sender, filter: SubscriptionFilter::default() });
                tracing::debug!(client_id = %id, total = clients.len(), "client registered");
            }
            Command::Unregister { id } => {
                clients.remove(&id);
                tracing::debug!(client_id = %id, total = clients.len(), "client unregistered");
            }
            Command::AddFilter { id, event_types } => {
                if let Some(entry) = clients.get_mut(&id) {
                    entry.filter.add(&event_types);
                }
            }
            Command::RemoveFilter { id, event_types } => {
                if let Some(entry) = clients.get_mut(&id) {
                    entry.filter.remove(&event_types);
                }
            }
            Command::Broadcast { envelope } => {
                let push = ServerPush::new(&envelope);
                let Ok(payload) = serde_json::to_string(&push) else {
                    tracing::error!(routing_key = envelope.routing_key(), "failed to serialize event for WS fan-out");
                    continue;
                };
                let mut disconnect = Vec::new();
                for (id, entry) in clients.iter() {
                    if !entry.filter.matches(envelope.routing_key()) {
                        continue;
                    }
                    if entry.sender.try_send(payload.clone()).is_err() {
                        // Buffer full (slow client) or channel closed: cut
                        // the connection rather than block the hub.
                        disconnect.push(*id);
                    }
                }
                for id in disconnect {
                    clients.remove(&id);
                    tracing::warn!(client_id = %id, "disconnected slow WS client");
                }
            }
            Command::ConnectedCount { reply } => {
                let _ = reply.send(clients.len());
            }
        }
    }
}
