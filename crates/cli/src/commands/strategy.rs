// SPDX-License-Identifier: MIT

//! `sfctl strategy` — CRUD and lineage over `/strategies` (spec.md §6.1).

use anyhow::Result;
use clap::{Args, Subcommand};
use sf_core::{LineageNode, Page, Strategy, StrategyId, StrategyWithBest};
use sf_wire::{CreateStrategyRequest, UpdateStrategyRequest};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{format_time_ago, print_json, OutputFormat};

#[derive(Args)]
pub struct StrategyArgs {
    #[command(subcommand)]
    pub command: StrategyCommand,
}

#[derive(Subcommand)]
pub enum StrategyCommand {
    /// List strategies, optionally filtered and sorted.
    List {
        /// Substring match against the strategy name.
        #[arg(long)]
        name_pattern: Option<String>,
        #[arg(long)]
        min_sharpe: Option<f64>,
        #[arg(long)]
        min_profit_pct: Option<f64>,
        #[arg(long)]
        max_drawdown_pct: Option<f64>,
        #[arg(long)]
        min_trades: Option<i64>,
        /// Column to sort by (e.g. "created_at", "sharpe_ratio").
        #[arg(long)]
        order_by: Option<String>,
        #[arg(long)]
        descending: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Show one strategy by id.
    Get { id: Uuid },
    /// Register a new strategy (root, or a child via `--parent-id`).
    Create {
        #[arg(long)]
        name: String,
        /// Strategy source code.
        #[arg(long)]
        code: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        parent_id: Option<Uuid>,
    },
    /// Update a strategy's descriptive metadata (name/description only).
    Update {
        id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a strategy.
    Delete { id: Uuid },
    /// Show a strategy's ancestry.
    Lineage {
        id: Uuid,
        /// How many generations to expand; 0 means unbounded.
        #[arg(long, default_value_t = 0)]
        depth: u32,
    },
}

pub async fn run(args: StrategyArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match args.command {
        StrategyCommand::List {
            name_pattern,
            min_sharpe,
            min_profit_pct,
            max_drawdown_pct,
            min_trades,
            order_by,
            descending,
            page,
            page_size,
        } => {
            let mut params = vec![("page".to_string(), page.to_string()), ("page_size".to_string(), page_size.to_string())];
            if let Some(v) = name_pattern {
                params.push(("name_pattern".to_string(), v));
            }
            if let Some(v) = min_sharpe {
                params.push(("min_sharpe".to_string(), v.to_string()));
            }
            if let Some(v) = min_profit_pct {
                params.push(("min_profit_pct".to_string(), v.to_string()));
            }
            if let Some(v) = max_drawdown_pct {
                params.push(("max_drawdown_pct".to_string(), v.to_string()));
            }
            if let Some(v) = min_trades {
                params.push(("min_trades".to_string(), v.to_string()));
            }
            if let Some(v) = order_by {
                params.push(("order_by".to_string(), v));
            }
            params.push(("ascending".to_string(), (!descending).to_string()));
            let pairs: Vec<(&str, String)> = params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
            let page: Page<StrategyWithBest> = client.get_query("/api/v1/strategies", &pairs).await?;
            print_list(&page, format)
        }
        StrategyCommand::Get { id } => {
            let strategy: Strategy = client.get(&format!("/api/v1/strategies/{id}")).await?;
            print_one(&strategy, format)
        }
        StrategyCommand::Create { name, code, description, parent_id } => {
            let body = CreateStrategyRequest { name, code, description, parent_id: parent_id.map(StrategyId::from) };
            let strategy: Strategy = client.post("/api/v1/strategies", &body).await?;
            print_one(&strategy, format)
        }
        StrategyCommand::Update { id, name, description } => {
            let body = UpdateStrategyRequest { name, description };
            let strategy: Strategy = client.put(&format!("/api/v1/strategies/{id}"), &body).await?;
            print_one(&strategy, format)
        }
        StrategyCommand::Delete { id } => {
            client.delete(&format!("/api/v1/strategies/{id}")).await?;
            println!("deleted {id}");
            Ok(())
        }
        StrategyCommand::Lineage { id, depth } => {
            let pairs = [("depth", depth.to_string())];
            let node: LineageNode = client.get_query(&format!("/api/v1/strategies/{id}/lineage"), &pairs).await?;
            if format == OutputFormat::Json {
                return print_json(&node);
            }
            print_lineage(&node, 0);
            Ok(())
        }
    }
}

fn print_one(strategy: &Strategy, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(strategy);
    }
    println!(
        "{}  {}  generation={}  created {}",
        strategy.id,
        strategy.name,
        strategy.generation,
        format_time_ago(strategy.created_at)
    );
    Ok(())
}

fn print_list(page: &Page<StrategyWithBest>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(page);
    }
    for row in &page.items {
        let sharpe = row.best_sharpe_ratio.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());
        let profit = row.best_profit_pct.map(|v| format!("{v:.2}%")).unwrap_or_else(|| "-".to_string());
        println!("{}  {}  sharpe={sharpe}  profit={profit}", row.strategy.id, row.strategy.name);
    }
    println!("page {}/{} ({} total)", page.page, page.total_pages.max(1), page.total_count);
    Ok(())
}

fn print_lineage(node: &LineageNode, depth: usize) {
    println!("{}{}  {}", "  ".repeat(depth), node.strategy.id, node.strategy.name);
    for child in &node.children {
        print_lineage(child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_serializes_without_optional_fields() {
        let body = CreateStrategyRequest { name: "ema".into(), code: "...".into(), description: None, parent_id: None };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"name\":\"ema\""));
    }
}
