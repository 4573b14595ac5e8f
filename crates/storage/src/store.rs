// SPDX-License-Identifier: MIT

//! Connection pool and migration entry point.

use crate::error::StorageResult;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Single source of truth for durable state (spec.md §4.1). Cheaply
/// cloneable: holds a pooled connection handle, not a single connection.
#[derive(Clone)]
pub struct Store {
    pub(crate) pool: PgPool,
}

impl Store {
    /// Connect with a bounded pool. `max_connections` should cover the
    /// scheduler's worker count plus the API surface's concurrency.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations. Called once at daemon startup, before any
    /// other component touches the store (SPEC_FULL.md §9 startup order).
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
