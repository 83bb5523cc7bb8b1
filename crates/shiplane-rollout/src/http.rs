//! Kubernetes-style REST client for the `Orchestrator` trait.
//!
//! Talks to the apps/v1 deployment API: GET for status, a strategic
//! merge patch for the image reference, and a pod list for restart
//! counts. The container being patched is assumed to carry the
//! deployment's name, which is how shiplane's manifests are laid out.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde_json::{Value, json};
use tracing::debug;

use shiplane_core::DeploymentRef;
use shiplane_core::config::OrchestratorConfig;

use crate::error::{RolloutError, RolloutResult};
use crate::orchestrator::{DeploymentStatus, Orchestrator};

const MERGE_PATCH_TYPE: &str = "application/strategic-merge-patch+json";

/// Orchestrator client over the Kubernetes REST API.
#[derive(Clone)]
pub struct HttpOrchestrator {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpOrchestrator {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }

    fn deployment_url(&self, target: &DeploymentRef) -> String {
        format!(
            "{}/apis/apps/v1/namespaces/{}/deployments/{}",
            self.base_url, target.namespace, target.name
        )
    }

    fn unexpected(op: &str, status: StatusCode) -> RolloutError {
        if status.is_server_error() {
            RolloutError::Unavailable(format!("{op}: {status}"))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            RolloutError::Auth(format!("{op}: {status}"))
        } else {
            RolloutError::Protocol(format!("{op}: unexpected status {status}"))
        }
    }

    /// Sum container restart counts across the deployment's pods.
    async fn restart_count(&self, target: &DeploymentRef) -> RolloutResult<u32> {
        let url = format!(
            "{}/api/v1/namespaces/{}/pods?labelSelector=app%3D{}",
            self.base_url, target.namespace, target.name
        );
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        if !resp.status().is_success() {
            return Err(Self::unexpected("list pods", resp.status()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| RolloutError::Protocol(format!("pod list body: {e}")))?;

        let mut restarts = 0u32;
        if let Some(items) = body.get("items").and_then(Value::as_array) {
            for pod in items {
                if let Some(statuses) = pod
                    .pointer("/status/containerStatuses")
                    .and_then(Value::as_array)
                {
                    for cs in statuses {
                        restarts += cs
                            .get("restartCount")
                            .and_then(Value::as_u64)
                            .unwrap_or(0) as u32;
                    }
                }
            }
        }
        Ok(restarts)
    }
}

#[async_trait]
impl Orchestrator for HttpOrchestrator {
    async fn status(&self, target: &DeploymentRef) -> RolloutResult<DeploymentStatus> {
        let resp = self
            .request(reqwest::Method::GET, self.deployment_url(target))
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(RolloutError::NotFound(target.to_string()));
            }
            s => return Err(Self::unexpected("get deployment", s)),
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| RolloutError::Protocol(format!("deployment body: {e}")))?;

        let image = body
            .pointer("/spec/template/spec/containers/0/image")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RolloutError::Protocol(format!("{target}: no container image in spec"))
            })?
            .to_string();
        let total = body
            .pointer("/spec/replicas")
            .and_then(Value::as_u64)
            .unwrap_or(1) as u32;
        let ready = body
            .pointer("/status/readyReplicas")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;

        let restarts = self.restart_count(target).await?;
        debug!(deployment = %target, image = image.as_str(), ready, total, restarts, "deployment status");

        Ok(DeploymentStatus {
            image,
            ready_replicas: ready,
            total_replicas: total,
            restarts,
        })
    }

    async fn set_image(&self, target: &DeploymentRef, image: &str) -> RolloutResult<()> {
        let patch = json!({
            "spec": {
                "template": {
                    "spec": {
                        "containers": [
                            { "name": target.name, "image": image }
                        ]
                    }
                }
            }
        });

        let resp = self
            .request(reqwest::Method::PATCH, self.deployment_url(target))
            .header(header::CONTENT_TYPE, MERGE_PATCH_TYPE)
            .json(&patch)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {
                debug!(deployment = %target, image, "image patched");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(RolloutError::NotFound(target.to_string())),
            s => Err(Self::unexpected("patch deployment", s)),
        }
    }
}
