// SPDX-License-Identifier: MIT

//! `sfctl optimization` — optimization run lifecycle over `/optimizations`
//! (spec.md §6.1, §4.4).

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use sf_core::{ControlAction, OptimizationRun, Page, StrategyId};
use sf_wire::{ControlRequest, CreateOptimizationRequest, OptimizationDetail};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::input::read_json_payload;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct OptimizationArgs {
    #[command(subcommand)]
    pub command: OptimizationCommand,
}

#[derive(Subcommand)]
pub enum OptimizationCommand {
    /// List optimization runs.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Show a run and its iterations.
    Get { id: Uuid },
    /// Start a new optimization run.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        base_strategy_id: Uuid,
        /// `OptimizationConfig` JSON (criteria, mode, max_iterations,
        /// base backtest config). Reads stdin if omitted.
        #[arg(long)]
        config: Option<String>,
    },
    /// Apply a control action to a run (pause/resume/cancel/complete/fail).
    Control {
        id: Uuid,
        #[arg(value_enum)]
        action: ControlActionArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ControlActionArg {
    Pause,
    Resume,
    Cancel,
    Complete,
    Fail,
}

impl From<ControlActionArg> for ControlAction {
    fn from(value: ControlActionArg) -> Self {
        match value {
            ControlActionArg::Pause => Self::Pause,
            ControlActionArg::Resume => Self::Resume,
            ControlActionArg::Cancel => Self::Cancel,
            ControlActionArg::Complete => Self::Complete,
            ControlActionArg::Fail => Self::Fail,
        }
    }
}

pub async fn run(args: OptimizationArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match args.command {
        OptimizationCommand::List { status, page, page_size } => {
            let mut params = vec![("page".to_string(), page.to_string()), ("page_size".to_string(), page_size.to_string())];
            if let Some(v) = status {
                params.push(("status".to_string(), v));
            }
            let pairs: Vec<(&str, String)> = params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
            let page: Page<OptimizationRun> = client.get_query("/api/v1/optimizations", &pairs).await?;
            print_list(&page, format)
        }
        OptimizationCommand::Get { id } => {
            let detail: OptimizationDetail = client.get(&format!("/api/v1/optimizations/{id}")).await?;
            print_detail(&detail, format)
        }
        OptimizationCommand::Create { name, base_strategy_id, config } => {
            let raw = read_json_payload(config)?;
            let config = serde_json::from_str(&raw)?;
            let body = CreateOptimizationRequest { name, base_strategy_id: StrategyId::from(base_strategy_id), config };
            let run: OptimizationRun = client.post("/api/v1/optimizations", &body).await?;
            print_one(&run, format)
        }
        OptimizationCommand::Control { id, action } => {
            let body = ControlRequest { action: action.into() };
            let run: OptimizationRun = client.post(&format!("/api/v1/optimizations/{id}/control"), &body).await?;
            print_one(&run, format)
        }
    }
}

fn print_one(run: &OptimizationRun, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(run);
    }
    println!("{}  {}  status={:?}  iteration={}", run.id, run.name, run.status, run.current_iteration);
    Ok(())
}

fn print_list(page: &Page<OptimizationRun>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(page);
    }
    for run in &page.items {
        println!("{}  {}  status={:?}  iteration={}", run.id, run.name, run.status, run.current_iteration);
    }
    println!("page {}/{} ({} total)", page.page, page.total_pages.max(1), page.total_count);
    Ok(())
}

fn print_detail(detail: &OptimizationDetail, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(detail);
    }
    print_one(&detail.run, format)?;
    for iteration in &detail.iterations {
        println!("  iteration {}  strategy={}", iteration.iteration_number, iteration.strategy_id);
    }
    Ok(())
}
