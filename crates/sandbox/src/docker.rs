// SPDX-License-Identifier: MIT

//! Docker sandbox backend (spec.md §4.2), grounded on the teacher's
//! `adapters::agent::docker` container-lifecycle shape (container create,
//! volume provisioning, graceful-then-forced stop), generalized from
//! long-lived coop containers to one-shot backtest runs and talking to the
//! Docker Engine API directly via `bollard` rather than shelling out.

use crate::backend::{ExecutionRequest, HandleSink, SandboxBackend};
use crate::config::{NetworkPolicy, SandboxConfig};
use crate::error::{SandboxError, SandboxResult};
use crate::report::{self, LOG_FILENAME, REPORT_FILENAME};
use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, DownloadFromContainerOptions,
    LogsOptions, RemoveContainerOptions, StopContainerOptions, UploadToContainerOptions,
};
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use bollard::Docker;
use futures_util::StreamExt;
use sf_core::SandboxHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sandbox backend that runs each backtest in a throwaway Docker container.
///
/// The working directory (strategy source + rendered config) is written to
/// a tarball and uploaded into the container's `/workdir` via the Docker
/// API's upload-to-container endpoint, matching the init-container-free
/// provisioning the teacher's docker adapter uses for its workspace volume.
pub struct DockerBackend {
    docker: Arc<Docker>,
    config: SandboxConfig,
}

impl DockerBackend {
    pub fn connect(config: SandboxConfig) -> SandboxResult<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker: Arc::new(docker), config })
    }

    fn host_config(&self) -> HostConfig {
        let network_mode = match self.config.network_policy {
            NetworkPolicy::None => Some("none".to_string()),
            NetworkPolicy::EgressOnly | NetworkPolicy::Full => None,
        };
        HostConfig {
            network_mode,
            nano_cpus: Some((self.config.cpu_quota_cores * 1_000_000_000.0) as i64),
            memory: Some(self.config.memory_cap_bytes),
            mounts: Some(vec![Mount {
                target: Some("/workdir/output".to_string()),
                typ: Some(MountTypeEnum::TMPFS),
                ..Default::default()
            }]),
            auto_remove: Some(false),
            ..Default::default()
        }
    }

    async fn create_and_start(&self, request: &ExecutionRequest, container_name: &str) -> SandboxResult<()> {
        let env = vec![format!("SF_JOB_ID={}", request.job_id)];
        let options = CreateContainerOptions { name: container_name.to_string(), platform: None };
        let config = ContainerConfig {
            image: Some(self.config.image.clone()),
            env: Some(env),
            working_dir: Some("/workdir".to_string()),
            host_config: Some(self.host_config()),
            ..Default::default()
        };
        self.docker
            .create_container(Some(options), config)
            .await
            .map_err(SandboxError::Docker)?;

        let tarball = build_input_tarball(request)?;
        self.docker
            .upload_to_container(
                container_name,
                Some(UploadToContainerOptions { path: "/workdir".to_string(), ..Default::default() }),
                tarball.into(),
            )
            .await
            .map_err(SandboxError::Docker)?;

        self.docker
            .start_container::<String>(container_name, None)
            .await
            .map_err(SandboxError::Docker)?;
        Ok(())
    }

    async fn collect_output(&self, container_name: &str) -> SandboxResult<(String, String)> {
        let mut stream = self.docker.download_from_container(
            container_name,
            Some(DownloadFromContainerOptions { path: "/workdir/output".to_string() }),
        );
        let mut archive = Vec::new();
        while let Some(chunk) = stream.next().await {
            archive.extend_from_slice(&chunk.map_err(SandboxError::Docker)?);
        }
        extract_report_and_log(&archive)
    }

    async fn stop_gracefully(&self, container_name: &str) {
        let _ = self
            .docker
            .stop_container(
                container_name,
                Some(StopContainerOptions { t: self.config.grace_period.as_secs() as i64 }),
            )
            .await;
    }

    async fn tail_logs(&self, container_name: &str) -> String {
        let mut stream = self.docker.logs(
            container_name,
            Some(LogsOptions::<String> { stdout: true, stderr: true, tail: "200".to_string(), ..Default::default() }),
        );
        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            if let Ok(log) = chunk {
                out.push_str(&log.to_string());
            }
        }
        out
    }
}

#[async_trait]
impl SandboxBackend for DockerBackend {
    async fn run(
        &self,
        request: &ExecutionRequest,
        cancel: CancellationToken,
        on_handle: HandleSink,
    ) -> SandboxResult<crate::report::BacktestReport> {
        let container_name = format!("sf-backtest-{}", request.job_id);
        self.create_and_start(request, &container_name).await?;

        let handle = SandboxHandle(container_name.clone());
        // The caller may already have dropped its receiver (e.g. it gave up
        // waiting); that's fine, the handle is only a convenience for
        // persisting state sooner.
        let _ = on_handle.send(handle.clone());

        let wait = self.docker.wait_container::<String>(&container_name, None).collect::<Vec<_>>();
        let outcome = tokio::select! {
            results = wait => Some(results),
            _ = tokio::time::sleep(self.config.timeout) => None,
            _ = cancel.cancelled() => None,
        };

        match outcome {
            None if cancel.is_cancelled() => {
                self.stop_gracefully(&container_name).await;
                self.cleanup(&handle).await;
                Err(SandboxError::Cancelled)
            }
            None => {
                // Timed out: graceful stop, then forced removal, never
                // attempt to parse whatever partial output exists.
                self.stop_gracefully(&container_name).await;
                self.cleanup(&handle).await;
                Err(SandboxError::Timeout)
            }
            Some(_results) => {
                let (report_json, log) = match self.collect_output(&container_name).await {
                    Ok(v) => v,
                    Err(e) => {
                        self.cleanup(&handle).await;
                        return Err(e);
                    }
                };
                let log = if log.is_empty() { self.tail_logs(&container_name).await } else { log };
                self.cleanup(&handle).await;
                report::parse_report(&report_json, &log, 200)
            }
        }
    }

    async fn cleanup(&self, handle: &SandboxHandle) {
        let _ = self
            .docker
            .remove_container(&handle.0, Some(RemoveContainerOptions { force: true, ..Default::default() }))
            .await;
    }

    async fn is_alive(&self, handle: &SandboxHandle) -> bool {
        matches!(
            self.docker.inspect_container(&handle.0, None).await,
            Ok(info) if info.state.and_then(|s| s.running).unwrap_or(false)
        )
    }
}

/// Build a minimal tar archive containing `strategy.src` and `config.json`
/// for upload into the container's working directory.
fn build_input_tarball(request: &ExecutionRequest) -> SandboxResult<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    append_tar_entry(&mut builder, "strategy.src", request.strategy_code.as_bytes())?;
    let config_json = serde_json::to_vec_pretty(&request.config)
        .map_err(|e| SandboxError::Executor(format!("render config: {e}")))?;
    append_tar_entry(&mut builder, "config.json", &config_json)?;
    builder.into_inner().map_err(SandboxError::Io)
}

fn append_tar_entry(builder: &mut tar::Builder<Vec<u8>>, name: &str, contents: &[u8]) -> SandboxResult<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, contents).map_err(SandboxError::Io)
}

/// Parse the tarball streamed back by `download_from_container` into the
/// report JSON and log text (spec.md §4.2: "read the expected output
/// artifact — a structured report plus log").
fn extract_report_and_log(archive: &[u8]) -> SandboxResult<(String, String)> {
    let mut report_json = String::new();
    let mut log = String::new();
    let mut reader = tar::Archive::new(archive);
    for entry in reader.entries().map_err(SandboxError::Io)? {
        let mut entry = entry.map_err(SandboxError::Io)?;
        let path = entry.path().map_err(SandboxError::Io)?.to_string_lossy().to_string();
        let mut buf = String::new();
        use std::io::Read;
        entry.read_to_string(&mut buf).map_err(SandboxError::Io)?;
        if path.ends_with(REPORT_FILENAME) {
            report_json = buf;
        } else if path.ends_with(LOG_FILENAME) {
            log = buf;
        }
    }
    if report_json.is_empty() {
        return Err(SandboxError::Parse("output/report.json missing from container output".into()));
    }
    Ok((report_json, log))
}

// `Duration` stays imported for doc-comment cross-reference clarity.
#[allow(unused_imports)]
use Duration as _DocDuration;
