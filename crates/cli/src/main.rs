// SPDX-License-Identifier: MIT

//! `sfctl` — operator CLI over the `sfd` request surface (spec.md §6.1:
//! "submit jobs, inspect queue, control runs"). Grounded on the teacher's
//! `oj` binary shape (top-level `Cli` with global flags, one
//! `commands::*` module per resource, `ExitError` carrying a process exit
//! code) but speaking HTTP/JSON to `sf-api` instead of a local daemon
//! socket.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod color;
mod commands;
mod exit_error;
mod input;
mod output;

use clap::{Parser, Subcommand};

use client::ApiClient;
use commands::{backtest, health, optimization, result, scout, strategy};
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "sfctl", version, about = "Operator CLI for the stratforge job fabric", styles = color::styles())]
struct Cli {
    /// Base URL of the `sfd` request surface.
    #[arg(long, env = "SFCTL_API_URL", default_value = "http://127.0.0.1:8080")]
    api_url: String,

    /// Output rendering for every command.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage strategies.
    Strategy(strategy::StrategyArgs),
    /// Submit and inspect backtest jobs.
    Backtest(backtest::BacktestArgs),
    /// Read backtest results.
    Result(result::ResultArgs),
    /// Manage optimization runs.
    Optimization(optimization::OptimizationArgs),
    /// Trigger and manage the scout agent.
    Scout(scout::ScoutArgs),
    /// Health and metrics.
    Health(health::HealthArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli).await {
        let exit_error = match err.downcast::<ExitError>() {
            Ok(exit_error) => exit_error,
            Err(err) => ExitError::new(1, err.to_string()),
        };
        eprintln!("{}: {}", color::context("error"), exit_error.message);
        std::process::exit(exit_error.code);
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let client = ApiClient::new(cli.api_url);
    match cli.command {
        Command::Strategy(args) => strategy::run(args, &client, cli.format).await,
        Command::Backtest(args) => backtest::run(args, &client, cli.format).await,
        Command::Result(args) => result::run(args, &client, cli.format).await,
        Command::Optimization(args) => optimization::run(args, &client, cli.format).await,
        Command::Scout(args) => scout::run(args, &client, cli.format).await,
        Command::Health(args) => health::run(args, &client, cli.format).await,
    }
}
