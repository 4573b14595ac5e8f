// SPDX-License-Identifier: MIT

//! `sfctl result` — read-only access to `/backtest-results` (spec.md §6.1:
//! "query-only, paginated").

use anyhow::Result;
use clap::{Args, Subcommand};
use sf_core::{BacktestResult, Page};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct ResultArgs {
    #[command(subcommand)]
    pub command: ResultCommand,
}

#[derive(Subcommand)]
pub enum ResultCommand {
    /// List backtest results.
    List {
        #[arg(long)]
        strategy_id: Option<Uuid>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Show one result.
    Get { id: Uuid },
}

pub async fn run(args: ResultArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match args.command {
        ResultCommand::List { strategy_id, page, page_size } => {
            let mut params = vec![("page".to_string(), page.to_string()), ("page_size".to_string(), page_size.to_string())];
            if let Some(v) = strategy_id {
                params.push(("strategy_id".to_string(), v.to_string()));
            }
            let pairs: Vec<(&str, String)> = params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
            let page: Page<BacktestResult> = client.get_query("/api/v1/backtest-results", &pairs).await?;
            print_list(&page, format)
        }
        ResultCommand::Get { id } => {
            let result: BacktestResult = client.get(&format!("/api/v1/backtest-results/{id}")).await?;
            print_one(&result, format)
        }
    }
}

fn print_one(result: &BacktestResult, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(result);
    }
    println!(
        "{}  job={}  sharpe={:.2}  profit={:.2}%  trades={}",
        result.id, result.job_id, result.metrics.sharpe_ratio, result.metrics.profit_pct, result.metrics.total_trades
    );
    Ok(())
}

fn print_list(page: &Page<BacktestResult>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(page);
    }
    for result in &page.items {
        println!(
            "{}  strategy={}  sharpe={:.2}  profit={:.2}%",
            result.id, result.strategy_id, result.metrics.sharpe_ratio, result.metrics.profit_pct
        );
    }
    println!("page {}/{} ({} total)", page.page, page.total_pages.max(1), page.total_count);
    Ok(())
}
