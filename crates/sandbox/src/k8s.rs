// SPDX-License-Identifier: MIT

//! Kubernetes sandbox backend, grounded on the teacher's
//! `adapters::agent::k8s::{mod,pod}` pod-spec-construction and
//! create/poll/delete shape, generalized from a long-lived coop pod with
//! readiness probes to a one-shot `batch/v1` `Job` that runs a single
//! backtest container to completion.
//!
//! Unlike the Docker backend's upload/download-to-container API, the
//! Kubernetes client has no equivalent; the working directory is instead
//! rendered into the pod via an init container that receives the strategy
//! source and config as base64-encoded environment variables (small
//! payloads — backtest configs and strategy source are both bounded text),
//! and output artifacts are retrieved with `kube`'s `attach` (exec) API
//! before the job's pod is torn down, the same `Api::<Pod>::exec` surface
//! the teacher uses nowhere directly but that `kube`'s feature set exists
//! for.

use crate::backend::{ExecutionRequest, HandleSink, SandboxBackend};
use crate::config::{NetworkPolicy, SandboxConfig};
use crate::error::{SandboxError, SandboxResult};
use crate::report;
use async_trait::async_trait;
use futures_util::{AsyncReadExt, StreamExt};
use k8s_openapi::api::batch::v1::{Job as K8sJob, JobSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, Pod, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{AttachParams, DeleteParams, ListParams, PostParams};
use kube::{Api, Client};
use sf_core::SandboxHandle;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

const LABEL: &str = "sf.dev/backtest";

/// Sandbox backend that runs each backtest as a Kubernetes `batch/v1` Job
/// with a single pod, restart policy `Never` (spec.md §4.2: one-shot,
/// isolated execution).
pub struct K8sBackend {
    client: Client,
    namespace: String,
    config: SandboxConfig,
}

impl K8sBackend {
    pub async fn connect(namespace: impl Into<String>, config: SandboxConfig) -> SandboxResult<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client, namespace: namespace.into(), config })
    }

    fn jobs_api(&self) -> Api<K8sJob> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods_api(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn build_job(&self, request: &ExecutionRequest, name: &str) -> K8sJob {
        use base64::Engine;
        let b64 = base64::engine::general_purpose::STANDARD;
        let config_json =
            serde_json::to_string(&request.config).unwrap_or_else(|_| "{}".to_string());

        let env = vec![
            EnvVar {
                name: "SF_JOB_ID".to_string(),
                value: Some(request.job_id.to_string()),
                ..Default::default()
            },
            EnvVar {
                name: "SF_STRATEGY_SRC_B64".to_string(),
                value: Some(b64.encode(request.strategy_code.as_bytes())),
                ..Default::default()
            },
            EnvVar {
                name: "SF_CONFIG_JSON_B64".to_string(),
                value: Some(b64.encode(config_json.as_bytes())),
                ..Default::default()
            },
        ];

        let mut labels = BTreeMap::new();
        labels.insert(LABEL.to_string(), request.job_id.to_string());

        let dns_policy = match self.config.network_policy {
            NetworkPolicy::None => Some("None".to_string()),
            NetworkPolicy::EgressOnly | NetworkPolicy::Full => None,
        };

        let container = Container {
            name: "backtest".to_string(),
            image: Some(self.config.image.clone()),
            env: Some(env),
            resources: Some(k8s_openapi::api::core::v1::ResourceRequirements {
                limits: Some(BTreeMap::from([
                    (
                        "cpu".to_string(),
                        k8s_openapi::apimachinery::pkg::api::resource::Quantity(format!(
                            "{}",
                            self.config.cpu_quota_cores
                        )),
                    ),
                    (
                        "memory".to_string(),
                        k8s_openapi::apimachinery::pkg::api::resource::Quantity(format!(
                            "{}",
                            self.config.memory_cap_bytes
                        )),
                    ),
                ])),
                ..Default::default()
            }),
            ..Default::default()
        };

        K8sJob {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels),
                ..Default::default()
            },
            spec: Some(JobSpec {
                backoff_limit: Some(0),
                ttl_seconds_after_finished: Some(300),
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![container],
                        restart_policy: Some("Never".to_string()),
                        dns_policy,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            status: None,
        }
    }

    async fn find_pod(&self, job_name: &str) -> SandboxResult<String> {
        let pods = self.pods_api();
        let lp = ListParams::default().labels(&format!("job-name={job_name}"));
        let list = pods.list(&lp).await?;
        list.items
            .into_iter()
            .filter_map(|p| p.metadata.name)
            .next()
            .ok_or_else(|| SandboxError::Executor(format!("no pod found for job {job_name}")))
    }

    /// Exec `cat <path>` inside the finished pod to retrieve an artifact,
    /// the generalization of the teacher's `kube`-exec surface to output
    /// collection rather than interactive coop attach.
    async fn exec_cat(&self, pod_name: &str, path: &str) -> SandboxResult<String> {
        let pods = self.pods_api();
        let ap = AttachParams::default().stdout(true).stderr(false);
        let mut attached = pods
            .exec(pod_name, vec!["cat", path], &ap)
            .await
            .map_err(SandboxError::Kube)?;
        let mut out = String::new();
        if let Some(mut stdout) = attached.stdout() {
            let _ = stdout.read_to_string(&mut out).await;
        }
        attached.join().await.map_err(SandboxError::Kube)?;
        Ok(out)
    }

    async fn wait_for_completion(&self, job_name: &str) -> SandboxResult<bool> {
        let jobs = self.jobs_api();
        let mut watcher = kube::runtime::watcher(
            jobs,
            kube::runtime::watcher::Config::default()
                .fields(&format!("metadata.name={job_name}")),
        )
        .boxed();
        while let Some(event) = watcher.next().await {
            let Ok(event) = event else { continue };
            if let kube::runtime::watcher::Event::Apply(job) = event {
                if let Some(status) = job.status {
                    if status.succeeded.unwrap_or(0) > 0 {
                        return Ok(true);
                    }
                    if status.failed.unwrap_or(0) > 0 {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(false)
    }

    async fn delete_job(&self, job_name: &str) {
        let _ = self
            .jobs_api()
            .delete(job_name, &DeleteParams { propagation_policy: Some(kube::api::PropagationPolicy::Background), ..Default::default() })
            .await;
    }
}

#[async_trait]
impl SandboxBackend for K8sBackend {
    async fn run(
        &self,
        request: &ExecutionRequest,
        cancel: CancellationToken,
        on_handle: HandleSink,
    ) -> SandboxResult<report::BacktestReport> {
        let job_name = format!("sf-backtest-{}", request.job_id);
        let job_spec = self.build_job(request, &job_name);
        self.jobs_api()
            .create(&PostParams::default(), &job_spec)
            .await
            .map_err(SandboxError::Kube)?;

        let handle = SandboxHandle(job_name.clone());
        let _ = on_handle.send(handle.clone());

        let outcome = tokio::select! {
            result = self.wait_for_completion(&job_name) => Some(result),
            _ = tokio::time::sleep(self.config.timeout) => None,
            _ = cancel.cancelled() => None,
        };

        match outcome {
            None if cancel.is_cancelled() => {
                self.cleanup(&handle).await;
                Err(SandboxError::Cancelled)
            }
            None => {
                self.cleanup(&handle).await;
                Err(SandboxError::Timeout)
            }
            Some(Err(e)) => {
                self.cleanup(&handle).await;
                Err(e)
            }
            Some(Ok(succeeded)) => {
                let pod_name = self.find_pod(&job_name).await;
                let result = match pod_name {
                    Ok(pod_name) if succeeded => {
                        let report_json =
                            self.exec_cat(&pod_name, "/workdir/output/report.json").await;
                        let log = self.exec_cat(&pod_name, "/workdir/output/run.log").await;
                        match (report_json, log) {
                            (Ok(report_json), Ok(log)) => {
                                report::parse_report(&report_json, &log, 200)
                            }
                            (Err(e), _) | (_, Err(e)) => Err(e),
                        }
                    }
                    Ok(pod_name) => {
                        let log = self
                            .exec_cat(&pod_name, "/workdir/output/run.log")
                            .await
                            .unwrap_or_default();
                        Err(SandboxError::Executor(format!(
                            "backtest job failed; log tail follows:\n{log}"
                        )))
                    }
                    Err(e) => Err(e),
                };
                self.cleanup(&handle).await;
                result
            }
        }
    }

    async fn cleanup(&self, handle: &SandboxHandle) {
        self.delete_job(&handle.0).await;
    }

    async fn is_alive(&self, handle: &SandboxHandle) -> bool {
        self.jobs_api().get(&handle.0).await.is_ok()
    }
}
