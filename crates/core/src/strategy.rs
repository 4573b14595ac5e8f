// SPDX-License-Identifier: MIT

//! Strategy — an immutable candidate trading strategy and its ancestry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a strategy.
    pub struct StrategyId;
}

/// A content-addressed fingerprint over normalized strategy source, used to
/// deduplicate submissions. Opaque beyond equality/hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Compute the fingerprint of normalized code (whitespace-collapsed,
    /// trailing-newline-stripped) via SHA-256.
    pub fn of_normalized(code: &str) -> Self {
        use sha2::{Digest, Sha256};
        let normalized: String = code
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        let normalized = normalized.trim();
        let digest = Sha256::digest(normalized.as_bytes());
        Fingerprint(format!("{digest:x}"))
    }
}

/// An immutable candidate strategy. Created once; only descriptive
/// metadata (name, tags, metadata blob) may be updated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: StrategyId,
    pub name: String,
    pub code: String,
    pub fingerprint: Fingerprint,
    /// Parent in the ancestry DAG, if this strategy was derived from another.
    pub parent_id: Option<StrategyId>,
    /// 0 for a root strategy, else `parent.generation + 1`.
    pub generation: u32,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Strategy {
    /// Build a root strategy (no parent) from its source code.
    pub fn new_root(name: impl Into<String>, code: impl Into<String>, now: DateTime<Utc>) -> Self {
        let code = code.into();
        let fingerprint = Fingerprint::of_normalized(&code);
        Self {
            id: StrategyId::new(),
            name: name.into(),
            code,
            fingerprint,
            parent_id: None,
            generation: 0,
            metadata: serde_json::Value::Null,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a derived strategy from a parent's generation.
    pub fn new_child(
        name: impl Into<String>,
        code: impl Into<String>,
        parent_id: StrategyId,
        parent_generation: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let code = code.into();
        let fingerprint = Fingerprint::of_normalized(&code);
        Self {
            id: StrategyId::new(),
            name: name.into(),
            code,
            fingerprint,
            parent_id: Some(parent_id),
            generation: parent_generation + 1,
            metadata: serde_json::Value::Null,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filters accepted by `search_strategies` (spec.md §4.1, §6.1).
#[derive(Debug, Clone, Default)]
pub struct StrategyQuery {
    pub name_pattern: Option<String>,
    pub min_sharpe: Option<f64>,
    pub min_profit_pct: Option<f64>,
    pub max_drawdown_pct: Option<f64>,
    pub min_trades: Option<i64>,
    pub order_by: Option<String>,
    pub ascending: bool,
    pub page: u32,
    pub page_size: u32,
}

impl StrategyQuery {
    pub fn new() -> Self {
        Self { page: 1, page_size: 20, ascending: true, ..Default::default() }
    }
}

/// A strategy annotated with its best observed result, as returned by
/// `search_strategies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyWithBest {
    pub strategy: Strategy,
    pub best_sharpe_ratio: Option<f64>,
    pub best_profit_pct: Option<f64>,
    pub best_result_id: Option<crate::result::ResultId>,
}

/// A page of results, matching the `{total_count, page, page_size,
/// total_pages}` envelope from spec.md §6.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            ((total_count as f64) / (page_size as f64)).ceil() as u32
        };
        Self { items, total_count, page, page_size, total_pages }
    }
}

/// Bounded breadth-first expansion node returned by `get_lineage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageNode {
    pub strategy: Strategy,
    pub level: u32,
    pub children: Vec<LineageNode>,
}

/// Default and maximum depth for `get_lineage` traversal (spec.md §9).
pub const DEFAULT_LINEAGE_DEPTH: u32 = 2;
pub const MAX_LINEAGE_DEPTH: u32 = 100;

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
