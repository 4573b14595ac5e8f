// SPDX-License-Identifier: MIT

//! `sfctl health` / `sfctl metrics` — `/health*` and `/metrics` (spec.md
//! §6.1, §7).

use anyhow::Result;
use clap::{Args, Subcommand};
use sf_wire::{HealthReport, HealthState, MetricsReport};

use crate::client::ApiClient;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct HealthArgs {
    #[command(subcommand)]
    pub command: HealthCommand,
}

#[derive(Subcommand)]
pub enum HealthCommand {
    /// Overall health (liveness + readiness).
    Show,
    /// Liveness only: is the process up at all.
    Live,
    /// Readiness: can the process serve requests right now.
    Ready,
    /// Scheduler/store/hub counters.
    Metrics,
}

pub async fn run(args: HealthArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match args.command {
        HealthCommand::Show => print_health(client.get("/api/v1/health").await?, format),
        HealthCommand::Live => print_health(client.get("/api/v1/health/live").await?, format),
        HealthCommand::Ready => print_health(client.get("/api/v1/health/ready").await?, format),
        HealthCommand::Metrics => {
            let report: MetricsReport = client.get("/api/v1/metrics").await?;
            if format == OutputFormat::Json {
                return print_json(&report);
            }
            println!(
                "pending_jobs={}  running_jobs={}  avg_wait_ms={:.0}  avg_run_ms={:.0}  connected_clients={}  scout_active={}",
                report.pending_jobs,
                report.running_jobs,
                report.avg_wait_ms,
                report.avg_run_ms,
                report.hub_connected_clients,
                report.active_scout_run
            );
            Ok(())
        }
    }
}

fn print_health(report: HealthReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(&report);
    }
    println!("status={}", state_label(report.status));
    for (component, state) in &report.components {
        println!("  {component}: {}", state_label(*state));
    }
    Ok(())
}

fn state_label(state: HealthState) -> &'static str {
    match state {
        HealthState::Ok => "ok",
        HealthState::Degraded => "degraded",
        HealthState::Unavailable => "unavailable",
    }
}
