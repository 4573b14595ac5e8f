//! Specs for `sfctl` behavior when `sfd` is unreachable — the one
//! end-to-end path exercisable without a live Postgres/RabbitMQ/sandbox
//! stack (spec.md §9's ambient dependencies).

use crate::prelude::*;

const UNROUTABLE: &str = "http://127.0.0.1:1";

#[test]
fn health_show_against_unreachable_daemon_fails_with_message() {
    cli()
        .args(["--api-url", UNROUTABLE, "health", "show"])
        .fails()
        .stderr_has("error");
}

#[test]
fn strategy_list_against_unreachable_daemon_fails() {
    cli().args(["--api-url", UNROUTABLE, "strategy", "list"]).fails();
}

#[test]
fn api_url_is_configurable_via_env_var() {
    cli()
        .env("SFCTL_API_URL", UNROUTABLE)
        .args(["health", "show"])
        .fails()
        .stderr_has("error");
}
