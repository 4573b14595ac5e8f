// SPDX-License-Identifier: MIT

//! `sfctl backtest` — submit and inspect backtest jobs (spec.md §6.1).

use anyhow::Result;
use clap::{Args, Subcommand};
use sf_core::{BacktestJob, Page, QueueStats, RunId, StrategyId};
use sf_wire::{BacktestDetail, CreateBacktestRequest, CreatedJob};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::input::read_json_payload;
use crate::output::{format_time_ago, print_json, OutputFormat};

#[derive(Args)]
pub struct BacktestArgs {
    #[command(subcommand)]
    pub command: BacktestCommand,
}

#[derive(Subcommand)]
pub enum BacktestCommand {
    /// List backtest jobs.
    List {
        #[arg(long)]
        strategy_id: Option<Uuid>,
        #[arg(long)]
        optimization_run_id: Option<Uuid>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Show a job and its result, if completed.
    Get { id: Uuid },
    /// Submit a new backtest job.
    Submit {
        #[arg(long)]
        strategy_id: Uuid,
        /// `BacktestConfig` JSON. Reads stdin if omitted.
        #[arg(long)]
        config: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
        #[arg(long)]
        optimization_run_id: Option<Uuid>,
    },
    /// Cancel a pending or running job.
    Cancel { id: Uuid },
    /// Show queue depth and dispatch latency.
    QueueStats,
}

pub async fn run(args: BacktestArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match args.command {
        BacktestCommand::List { strategy_id, optimization_run_id, status, page, page_size } => {
            let mut params = vec![("page".to_string(), page.to_string()), ("page_size".to_string(), page_size.to_string())];
            if let Some(v) = strategy_id {
                params.push(("strategy_id".to_string(), v.to_string()));
            }
            if let Some(v) = optimization_run_id {
                params.push(("optimization_run_id".to_string(), v.to_string()));
            }
            if let Some(v) = status {
                params.push(("status".to_string(), v));
            }
            let pairs: Vec<(&str, String)> = params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
            let page: Page<BacktestJob> = client.get_query("/api/v1/backtests", &pairs).await?;
            print_list(&page, format)
        }
        BacktestCommand::Get { id } => {
            let detail: BacktestDetail = client.get(&format!("/api/v1/backtests/{id}")).await?;
            print_detail(&detail, format)
        }
        BacktestCommand::Submit { strategy_id, config, priority, optimization_run_id } => {
            let raw = read_json_payload(config)?;
            let config = serde_json::from_str(&raw)?;
            let body = CreateBacktestRequest {
                strategy_id: StrategyId::from(strategy_id),
                config,
                priority,
                optimization_run_id: optimization_run_id.map(RunId::from),
            };
            let created: CreatedJob = client.post("/api/v1/backtests", &body).await?;
            if format == OutputFormat::Json {
                return print_json(&serde_json::json!({ "job_id": created.job_id }));
            }
            println!("submitted {}", created.job_id);
            Ok(())
        }
        BacktestCommand::Cancel { id } => {
            client.delete(&format!("/api/v1/backtests/{id}")).await?;
            println!("cancelled {id}");
            Ok(())
        }
        BacktestCommand::QueueStats => {
            let stats: QueueStats = client.get("/api/v1/backtests/queue/stats").await?;
            if format == OutputFormat::Json {
                return print_json(&stats);
            }
            println!(
                "pending={} running={} avg_wait_ms={:.0} avg_run_ms={:.0}",
                stats.pending_jobs, stats.running_jobs, stats.avg_wait_ms, stats.avg_run_ms
            );
            Ok(())
        }
    }
}

fn print_list(page: &Page<BacktestJob>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(page);
    }
    for job in &page.items {
        println!(
            "{}  strategy={}  status={:?}  submitted {}",
            job.id,
            job.strategy_id,
            job.status,
            format_time_ago(job.created_at)
        );
    }
    println!("page {}/{} ({} total)", page.page, page.total_pages.max(1), page.total_count);
    Ok(())
}

fn print_detail(detail: &BacktestDetail, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(detail);
    }
    println!("{}  strategy={}  status={:?}", detail.job.id, detail.job.strategy_id, detail.job.status);
    match &detail.result {
        Some(result) => println!(
            "sharpe={:.2}  profit={:.2}%  max_drawdown={:.2}%",
            result.metrics.sharpe_ratio, result.metrics.profit_pct, result.metrics.max_drawdown_pct
        ),
        None => println!("(no result yet)"),
    }
    Ok(())
}
