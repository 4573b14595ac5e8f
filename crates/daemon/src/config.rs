// SPDX-License-Identifier: MIT

//! Environment-variable-driven daemon configuration (spec.md §9), grounded
//! on `oj-daemon::env`'s "one function per variable, sane default" shape.

use std::time::Duration;

/// Which [`sf_sandbox::SandboxBackend`] `sfd` constructs at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxBackendKind {
    Docker,
    K8s,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub amqp_url: String,
    pub exchange: String,
    pub listen_addr: String,
    pub sandbox_backend: SandboxBackendKind,
    pub sandbox_image: String,
    pub k8s_namespace: String,
    pub worker_count: usize,
}

impl DaemonConfig {
    /// Load from `SF_*` environment variables, falling back to development
    /// defaults for everything but `SF_DATABASE_URL` (no sensible default
    /// for a connection string).
    pub fn load() -> Self {
        Self {
            database_url: std::env::var("SF_DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/stratforge".to_string()),
            db_max_connections: env_u32("SF_DB_MAX_CONNECTIONS", 16),
            amqp_url: std::env::var("SF_AMQP_URL")
                .unwrap_or_else(|_| "amqp://127.0.0.1:5672/%2f".to_string()),
            exchange: std::env::var("SF_EXCHANGE").unwrap_or_else(|_| "stratforge.events".to_string()),
            listen_addr: std::env::var("SF_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            sandbox_backend: match std::env::var("SF_SANDBOX_BACKEND").as_deref() {
                Ok("k8s") => SandboxBackendKind::K8s,
                _ => SandboxBackendKind::Docker,
            },
            sandbox_image: std::env::var("SF_SANDBOX_IMAGE")
                .unwrap_or_else(|_| "stratforge/backtest-runner:latest".to_string()),
            k8s_namespace: std::env::var("SF_K8S_NAMESPACE").unwrap_or_else(|_| "default".to_string()),
            worker_count: env_u32("SF_WORKER_COUNT", 4) as usize,
        }
    }

    pub fn eventbus_config(&self) -> sf_eventbus::EventBusConfig {
        sf_eventbus::EventBusConfig { amqp_url: self.amqp_url.clone(), exchange: self.exchange.clone(), ..Default::default() }
    }

    pub fn sandbox_config(&self) -> sf_sandbox::SandboxConfig {
        sf_sandbox::SandboxConfig { image: self.sandbox_image.clone(), ..Default::default() }
    }

    pub fn scheduler_config(&self) -> sf_scheduler::SchedulerConfig {
        sf_scheduler::SchedulerConfig { worker_count: self.worker_count, ..Default::default() }
    }
}

/// Upper bound the shutdown sequence waits for each component to drain,
/// matching the 30s deadline each component already enforces internally
/// (spec.md §5); `sfd` itself only needs this for the final `axum::serve`
/// graceful-shutdown hook.
pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}
