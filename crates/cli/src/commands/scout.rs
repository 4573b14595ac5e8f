// SPDX-License-Identifier: MIT

//! `sfctl scout` — manual triggers, run history, and cron schedules over
//! `/agents/scout` (spec.md §6.1, §4.7).

use anyhow::Result;
use clap::{Args, Subcommand};
use sf_core::{Page, ScoutRun, ScoutSchedule};
use sf_wire::{ScoutScheduleRequest, ScoutTriggerRequest};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct ScoutArgs {
    #[command(subcommand)]
    pub command: ScoutCommand,
}

#[derive(Subcommand)]
pub enum ScoutCommand {
    /// Trigger a one-off discovery run.
    Trigger {
        #[arg(long)]
        source: String,
        #[arg(long)]
        max_strategies: Option<u32>,
    },
    /// List past scout runs.
    Runs {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Show one scout run.
    Run { id: Uuid },
    /// Cancel a pending or running scout run.
    CancelRun { id: Uuid },
    /// List cron schedules.
    Schedules {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Show one schedule.
    Schedule { id: Uuid },
    /// Create a cron schedule.
    CreateSchedule {
        #[arg(long)]
        name: String,
        #[arg(long)]
        cron_expression: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        max_strategies: Option<u32>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Update a cron schedule.
    UpdateSchedule {
        id: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        cron_expression: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        max_strategies: Option<u32>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Delete a cron schedule.
    DeleteSchedule { id: Uuid },
}

pub async fn run(args: ScoutArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match args.command {
        ScoutCommand::Trigger { source, max_strategies } => {
            let body = ScoutTriggerRequest { source, max_strategies };
            let run: ScoutRun = client.post("/api/v1/agents/scout/trigger", &body).await?;
            print_run(&run, format)
        }
        ScoutCommand::Runs { page, page_size } => {
            let pairs = [("page", page.to_string()), ("page_size", page_size.to_string())];
            let page: Page<ScoutRun> = client.get_query("/api/v1/agents/scout/runs", &pairs).await?;
            print_run_list(&page, format)
        }
        ScoutCommand::Run { id } => {
            let run: ScoutRun = client.get(&format!("/api/v1/agents/scout/runs/{id}")).await?;
            print_run(&run, format)
        }
        ScoutCommand::CancelRun { id } => {
            client.delete(&format!("/api/v1/agents/scout/runs/{id}")).await?;
            println!("cancelled {id}");
            Ok(())
        }
        ScoutCommand::Schedules { page, page_size } => {
            let pairs = [("page", page.to_string()), ("page_size", page_size.to_string())];
            let page: Page<ScoutSchedule> = client.get_query("/api/v1/agents/scout/schedules", &pairs).await?;
            print_schedule_list(&page, format)
        }
        ScoutCommand::Schedule { id } => {
            let schedule: ScoutSchedule = client.get(&format!("/api/v1/agents/scout/schedules/{id}")).await?;
            print_schedule(&schedule, format)
        }
        ScoutCommand::CreateSchedule { name, cron_expression, source, max_strategies, enabled } => {
            let body = ScoutScheduleRequest { name, cron_expression, source, max_strategies, enabled };
            let schedule: ScoutSchedule = client.post("/api/v1/agents/scout/schedules", &body).await?;
            print_schedule(&schedule, format)
        }
        ScoutCommand::UpdateSchedule { id, name, cron_expression, source, max_strategies, enabled } => {
            let body = ScoutScheduleRequest { name, cron_expression, source, max_strategies, enabled };
            let schedule: ScoutSchedule = client.put(&format!("/api/v1/agents/scout/schedules/{id}"), &body).await?;
            print_schedule(&schedule, format)
        }
        ScoutCommand::DeleteSchedule { id } => {
            client.delete(&format!("/api/v1/agents/scout/schedules/{id}")).await?;
            println!("deleted {id}");
            Ok(())
        }
    }
}

fn print_run(run: &ScoutRun, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(run);
    }
    println!("{}  source={}  status={:?}", run.id, run.source, run.status);
    Ok(())
}

fn print_run_list(page: &Page<ScoutRun>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(page);
    }
    for run in &page.items {
        println!("{}  source={}  status={:?}", run.id, run.source, run.status);
    }
    println!("page {}/{} ({} total)", page.page, page.total_pages.max(1), page.total_count);
    Ok(())
}

fn print_schedule(schedule: &ScoutSchedule, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(schedule);
    }
    println!(
        "{}  {}  cron=\"{}\"  enabled={}",
        schedule.id, schedule.name, schedule.cron_expression, schedule.enabled
    );
    Ok(())
}

fn print_schedule_list(page: &Page<ScoutSchedule>, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(page);
    }
    for schedule in &page.items {
        println!(
            "{}  {}  cron=\"{}\"  enabled={}",
            schedule.id, schedule.name, schedule.cron_expression, schedule.enabled
        );
    }
    println!("page {}/{} ({} total)", page.page, page.total_pages.max(1), page.total_count);
    Ok(())
}
