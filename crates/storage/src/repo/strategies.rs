// SPDX-License-Identifier: MIT

//! `Strategy` persistence: ancestry DAG, fingerprint dedup, search with
//! joined best-result metrics, and bounded lineage traversal (spec.md §3,
//! §4.1, §9).

use crate::error::{map_write_error, not_found, StorageResult};
use crate::repo::rows::StrategyRow;
use crate::store::Store;
use sf_core::{
    LineageNode, Page, ResultId, Strategy, StrategyId, StrategyQuery, StrategyWithBest,
    DEFAULT_LINEAGE_DEPTH, MAX_LINEAGE_DEPTH,
};
use std::collections::HashSet;

impl Store {
    /// Insert a new immutable strategy. Fails with `Duplicate` on a
    /// fingerprint collision (spec.md §3 invariant).
    pub async fn submit_strategy(&self, strategy: &Strategy) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO strategies
                (id, name, code, fingerprint, parent_id, generation, metadata, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(strategy.id.as_uuid())
        .bind(&strategy.name)
        .bind(&strategy.code)
        .bind(&strategy.fingerprint.0)
        .bind(strategy.parent_id.map(|p| p.as_uuid()))
        .bind(strategy.generation as i32)
        .bind(&strategy.metadata)
        .bind(&strategy.tags)
        .bind(strategy.created_at)
        .bind(strategy.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "strategy"))?;
        Ok(())
    }

    pub async fn get_strategy(&self, id: StrategyId) -> StorageResult<Strategy> {
        let row = sqlx::query_as::<_, StrategyRow>(
            "SELECT id, name, code, fingerprint, parent_id, generation, metadata, tags, created_at, updated_at \
             FROM strategies WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "strategy"))?
        .ok_or_else(|| not_found("strategy", id))?;
        row.try_into()
    }

    /// Update descriptive metadata only (spec.md §3: "never mutated except
    /// for descriptive metadata"): `name`, plus `description` folded into
    /// the `metadata` blob under a `description` key (`Strategy` has no
    /// literal `description` column).
    pub async fn update_strategy(
        &self,
        id: StrategyId,
        name: &str,
        description: Option<&str>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE strategies SET name = $1, \
             metadata = jsonb_set(COALESCE(metadata, '{}'::jsonb), '{description}', to_jsonb($2::text)), \
             updated_at = $3 WHERE id = $4",
        )
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "strategy"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("strategy", id));
        }
        Ok(())
    }

    /// Deletable only when unreferenced by jobs or runs (spec.md §3),
    /// otherwise `ResourceInUse`.
    pub async fn delete_strategy(&self, id: StrategyId) -> StorageResult<()> {
        let referenced: i64 = sqlx::query_scalar(
            "SELECT (EXISTS (SELECT 1 FROM backtest_jobs WHERE strategy_id = $1) \
                  OR EXISTS (SELECT 1 FROM optimization_runs WHERE base_strategy_id = $1) \
                  OR EXISTS (SELECT 1 FROM optimization_iterations WHERE strategy_id = $1) \
                  OR EXISTS (SELECT 1 FROM strategies WHERE parent_id = $1))::int",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "strategy"))?;
        if referenced != 0 {
            return Err(sf_core::DomainError::ResourceInUse(format!(
                "strategy {id} is referenced by a job, run, iteration, or descendant"
            ))
            .into());
        }
        let result = sqlx::query("DELETE FROM strategies WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "strategy"))?;
        if result.rows_affected() == 0 {
            return Err(not_found("strategy", id));
        }
        Ok(())
    }

    /// Filtered, paginated strategy search joined against each strategy's
    /// best observed result (spec.md §4.1 `search_strategies`).
    ///
    /// The `contains` wildcard policy (SPEC_FULL.md §5.1): the server
    /// always wraps `name_pattern` in `%...%` itself before binding it.
    pub async fn search_strategies(&self, query: &StrategyQuery) -> StorageResult<Page<StrategyWithBest>> {
        let page = query.page.max(1);
        let page_size = query.page_size.max(1);
        let offset = (page - 1) as i64 * page_size as i64;
        let name_pattern = query.name_pattern.as_ref().map(|p| format!("%{p}%"));
        let order_by = match query.order_by.as_deref() {
            Some("sharpe") => "best_sharpe_ratio",
            Some("profit_pct") => "best_profit_pct",
            Some("created_at") => "s.created_at",
            _ => "s.created_at",
        };
        let direction = if query.ascending { "ASC" } else { "DESC" };

        let sql = format!(
            r#"
            SELECT s.id, s.name, s.code, s.fingerprint, s.parent_id, s.generation, s.metadata, s.tags,
                   s.created_at, s.updated_at,
                   best.sharpe_ratio AS best_sharpe_ratio,
                   best.profit_pct AS best_profit_pct,
                   best.id AS best_result_id
            FROM strategies s
            LEFT JOIN LATERAL (
                SELECT id, sharpe_ratio, profit_pct, max_drawdown_pct, total_trades
                FROM backtest_results r
                WHERE r.strategy_id = s.id
                ORDER BY r.sharpe_ratio DESC
                LIMIT 1
            ) best ON true
            WHERE ($1::text IS NULL OR s.name ILIKE $1)
              AND ($2::float8 IS NULL OR best.sharpe_ratio >= $2)
              AND ($3::float8 IS NULL OR best.profit_pct >= $3)
              AND ($4::float8 IS NULL OR best.max_drawdown_pct <= $4 OR best.max_drawdown_pct IS NULL)
              AND ($5::int8 IS NULL OR best.total_trades >= $5)
            ORDER BY {order_by} {direction} NULLS LAST
            LIMIT $6 OFFSET $7
            "#
        );

        let rows: Vec<(StrategyRow, Option<f64>, Option<f64>, Option<uuid::Uuid>)> = sqlx::query_as(&sql)
            .bind(&name_pattern)
            .bind(query.min_sharpe)
            .bind(query.min_profit_pct)
            .bind(query.max_drawdown_pct)
            .bind(query.min_trades)
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "strategy"))?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM strategies s
            LEFT JOIN LATERAL (
                SELECT sharpe_ratio, profit_pct, max_drawdown_pct, total_trades
                FROM backtest_results r WHERE r.strategy_id = s.id
                ORDER BY r.sharpe_ratio DESC LIMIT 1
            ) best ON true
            WHERE ($1::text IS NULL OR s.name ILIKE $1)
              AND ($2::float8 IS NULL OR best.sharpe_ratio >= $2)
              AND ($3::float8 IS NULL OR best.profit_pct >= $3)
              AND ($4::float8 IS NULL OR best.max_drawdown_pct <= $4 OR best.max_drawdown_pct IS NULL)
              AND ($5::int8 IS NULL OR best.total_trades >= $5)
            "#,
        )
        .bind(&name_pattern)
        .bind(query.min_sharpe)
        .bind(query.min_profit_pct)
        .bind(query.max_drawdown_pct)
        .bind(query.min_trades)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "strategy"))?;

        let mut items = Vec::with_capacity(rows.len());
        for (row, best_sharpe_ratio, best_profit_pct, best_result_id) in rows {
            items.push(StrategyWithBest {
                strategy: row.try_into()?,
                best_sharpe_ratio,
                best_profit_pct,
                best_result_id: best_result_id.map(ResultId::from_uuid),
            });
        }

        Ok(Page::new(items, total.max(0) as u64, page, page_size))
    }

    /// Bounded breadth-first expansion of descendants, depth-capped per
    /// SPEC_FULL.md §9 (default 2, hard cap 100), using an explicit
    /// visited set rather than relying on language-level cycle detection.
    pub async fn get_lineage(&self, root: StrategyId, depth: u32) -> StorageResult<LineageNode> {
        let depth = if depth == 0 { DEFAULT_LINEAGE_DEPTH } else { depth.min(MAX_LINEAGE_DEPTH) };
        let root_strategy = self.get_strategy(root).await?;
        let mut visited = HashSet::new();
        visited.insert(root);
        self.lineage_node(root_strategy, 0, depth, &mut visited).await
    }

    fn lineage_node<'a>(
        &'a self,
        strategy: Strategy,
        level: u32,
        max_depth: u32,
        visited: &'a mut HashSet<StrategyId>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = StorageResult<LineageNode>> + Send + 'a>> {
        Box::pin(async move {
            let mut children = Vec::new();
            if level < max_depth {
                let child_rows = sqlx::query_as::<_, StrategyRow>(
                    "SELECT id, name, code, fingerprint, parent_id, generation, metadata, tags, created_at, updated_at \
                     FROM strategies WHERE parent_id = $1 ORDER BY created_at ASC",
                )
                .bind(strategy.id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_write_error(e, "strategy"))?;

                for row in child_rows {
                    let child: Strategy = row.try_into()?;
                    if !visited.insert(child.id) {
                        continue;
                    }
                    children.push(self.lineage_node(child, level + 1, max_depth, visited).await?);
                }
            }
            Ok(LineageNode { strategy, level, children })
        })
    }
}
