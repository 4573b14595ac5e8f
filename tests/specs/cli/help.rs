//! CLI help output specs

use crate::prelude::*;

#[test]
fn sfctl_no_args_shows_usage_and_exits_nonzero() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn sfctl_help_shows_usage() {
    cli().args(["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn sfctl_help_shows_all_resources() {
    cli()
        .args(["--help"])
        .passes()
        .stdout_has("strategy")
        .stdout_has("backtest")
        .stdout_has("optimization")
        .stdout_has("scout")
        .stdout_has("health");
}

#[test]
fn sfctl_strategy_help_shows_subcommands() {
    cli()
        .args(["strategy", "--help"])
        .passes()
        .stdout_has("list")
        .stdout_has("create")
        .stdout_has("lineage");
}

#[test]
fn sfctl_backtest_help_shows_subcommands() {
    cli()
        .args(["backtest", "--help"])
        .passes()
        .stdout_has("submit")
        .stdout_has("cancel")
        .stdout_has("queue-stats");
}

#[test]
fn sfctl_version_shows_version() {
    cli().args(["--version"]).passes().stdout_has("0.1");
}
