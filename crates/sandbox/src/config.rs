// SPDX-License-Identifier: MIT

//! Resource caps configured once at executor construction, with per-job
//! overrides (spec.md §4.2 "Resource caps are configured once at executor
//! construction... Per-job caps may override defaults").

use std::time::Duration;

/// Egress policy applied to a sandbox container's network namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkPolicy {
    /// No network access at all (`--network none`).
    None,
    /// Outbound only; no inbound port publishing.
    EgressOnly,
    /// Unrestricted.
    Full,
}

/// Default executor-wide resource caps (spec.md §9 config surface).
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub image: String,
    pub cpu_quota_cores: f64,
    pub memory_cap_bytes: i64,
    pub timeout: Duration,
    /// Grace period granted to a container after a graceful stop request
    /// before it is forcibly killed (spec.md §4.2 "graceful termination is
    /// attempted first... then forced").
    pub grace_period: Duration,
    pub network_policy: NetworkPolicy,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "stratforge/backtest-runner:latest".to_string(),
            cpu_quota_cores: 1.0,
            memory_cap_bytes: 512 * 1024 * 1024,
            timeout: Duration::from_secs(30 * 60),
            grace_period: Duration::from_secs(10),
            network_policy: NetworkPolicy::EgressOnly,
        }
    }
}

/// Per-job overrides layered on top of [`SandboxConfig`]'s defaults.
#[derive(Debug, Clone, Default)]
pub struct SandboxOverrides {
    pub cpu_quota_cores: Option<f64>,
    pub memory_cap_bytes: Option<i64>,
    pub timeout: Option<Duration>,
}

impl SandboxConfig {
    pub fn with_overrides(&self, overrides: &SandboxOverrides) -> Self {
        Self {
            image: self.image.clone(),
            cpu_quota_cores: overrides.cpu_quota_cores.unwrap_or(self.cpu_quota_cores),
            memory_cap_bytes: overrides.memory_cap_bytes.unwrap_or(self.memory_cap_bytes),
            timeout: overrides.timeout.unwrap_or(self.timeout),
            grace_period: self.grace_period,
            network_policy: self.network_policy,
        }
    }
}
