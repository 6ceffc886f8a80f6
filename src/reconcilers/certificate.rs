// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! TLS certificate lifecycle.
//!
//! The stage drives the certificate state machine for a resource's managed
//! host:
//!
//! - no certificate yet: request one, record `pending`, continue
//! - creation races with an existing certificate: switch to the fetch path
//! - issuance pending: refresh the status annotation, continue; a later
//!   re-trigger picks the secret up
//! - issued: copy the secret into the resource namespace as
//!   `hcg-tls-<name>` with an owner reference, record `ready`, and hand the
//!   secret to the adapter's TLS block
//! - resource deleted: tear down the certificate and the copied secret,
//!   tolerating not-found on both

use crate::constants::{ANNOTATION_CERTIFICATE_STATE, ANNOTATION_TRAFFIC_KEY, LABEL_MANAGED};
use crate::metrics;
use crate::tls::{tls_secret_name, CertProvider, CertStatus, CertificateRequest};
use crate::traffic::TrafficResource;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::reconcilers::{StageOutcome, TrafficStage};

/// Capability to read and write plain secrets in end-user namespaces.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret; `None` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Secret>>;

    /// Create the secret, or overwrite its data if it already exists.
    async fn upsert(&self, namespace: &str, secret: &Secret) -> anyhow::Result<()>;

    /// Delete the secret, tolerating not-found.
    async fn delete(&self, namespace: &str, name: &str) -> anyhow::Result<()>;
}

/// [`SecretStore`] over the Kubernetes API.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        KubeSecretStore { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn is_api_code(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == code)
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Secret>> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn upsert(&self, namespace: &str, secret: &Secret) -> anyhow::Result<()> {
        let api = self.api(namespace);
        match api.create(&PostParams::default(), secret).await {
            Ok(_) => Ok(()),
            Err(err) if is_api_code(&err, 409) => {
                let name = secret.metadata.name.clone().unwrap_or_default();
                let mut existing = api.get(&name).await?;
                existing.data.clone_from(&secret.data);
                existing.metadata.owner_references = secret.metadata.owner_references.clone();
                api.replace(&name, &PostParams::default(), &existing).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> anyhow::Result<()> {
        match self.api(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(err) if is_api_code(&err, 404) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Pipeline stage driving the certificate lifecycle.
pub struct CertificateStage {
    provider: Arc<dyn CertProvider>,
    secrets: Arc<dyn SecretStore>,
}

impl CertificateStage {
    #[must_use]
    pub fn new(provider: Arc<dyn CertProvider>, secrets: Arc<dyn SecretStore>) -> Self {
        CertificateStage { provider, secrets }
    }

    /// Build the namespace-local copy of the issued secret, owned by the
    /// traffic resource so it is garbage collected along with it.
    fn secret_copy<T: TrafficResource>(resource: &T, issued: &Secret, name: &str) -> Secret {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_MANAGED.to_string(), "true".to_string());
        let mut annotations = BTreeMap::new();
        annotations.insert(ANNOTATION_TRAFFIC_KEY.to_string(), resource.key().to_string());
        let mut copy = issued.clone();
        copy.metadata.name = Some(name.to_string());
        copy.metadata.namespace = Some(resource.namespace());
        copy.metadata.resource_version = None;
        copy.metadata.uid = None;
        copy.metadata.labels = Some(labels);
        copy.metadata.annotations = Some(annotations);
        copy.metadata.owner_references = Some(vec![resource.owner_reference()]);
        copy
    }

    async fn reconcile_deleted<T: TrafficResource>(
        &self,
        resource: &T,
        request: &CertificateRequest,
    ) -> StageOutcome {
        if let Err(err) = self.provider.delete(request).await {
            if !err.is_not_found() {
                return StageOutcome::halt_with(err.into());
            }
        }
        let secret_name = tls_secret_name(&resource.name());
        if let Err(err) = self.secrets.delete(&resource.namespace(), &secret_name).await {
            return StageOutcome::halt_with(err);
        }
        debug!(resource = %resource.key(), certificate = %request.name,
            "certificate and copied secret torn down");
        StageOutcome::proceed()
    }

    async fn reconcile_issued<T: TrafficResource>(
        &self,
        resource: &mut T,
        request: &CertificateRequest,
        issued: &Secret,
    ) -> StageOutcome {
        let previous = resource.annotation(ANNOTATION_CERTIFICATE_STATE).map(str::to_string);
        resource.set_annotation(ANNOTATION_CERTIFICATE_STATE, CertStatus::Ready.as_str());
        if previous.as_deref() != Some(CertStatus::Ready.as_str()) {
            metrics::record_certificate_issued();
            info!(resource = %resource.key(), certificate = %request.name,
                "certificate issued");
        }

        let secret_name = tls_secret_name(&resource.name());
        let copy = Self::secret_copy(resource, issued, &secret_name);
        if let Err(err) = self.secrets.upsert(&resource.namespace(), &copy).await {
            return StageOutcome::halt_with(err);
        }
        resource.apply_tls_secret(issued, &secret_name);
        StageOutcome::proceed()
    }
}

#[async_trait]
impl<T: TrafficResource> TrafficStage<T> for CertificateStage {
    fn name(&self) -> &'static str {
        "certificate"
    }

    async fn reconcile(&self, resource: &mut T) -> StageOutcome {
        let request = CertificateRequest::for_resource(resource);
        if request.host.is_empty() {
            // No managed host yet; nothing to issue against.
            return StageOutcome::proceed();
        }

        if resource.is_deleted() {
            return self.reconcile_deleted(resource, &request).await;
        }

        match self.provider.create(&request).await {
            Ok(()) => {
                info!(resource = %resource.key(), certificate = %request.name,
                    host = %request.host, "certificate requested");
                metrics::record_certificate_requested();
                resource.set_annotation(ANNOTATION_CERTIFICATE_STATE, CertStatus::Pending.as_str());
                StageOutcome::proceed()
            }
            Err(err) if err.is_already_exists() => {
                match self.provider.certificate_secret(&request).await {
                    Ok(issued) => self.reconcile_issued(resource, &request, &issued).await,
                    Err(err) if err.is_not_ready() => {
                        let status = match self.provider.certificate_status(&request).await {
                            Ok(status) => status,
                            Err(err) => return StageOutcome::halt_with(err.into()),
                        };
                        debug!(resource = %resource.key(), certificate = %request.name,
                            status = status.as_str(), "certificate not ready yet");
                        resource.set_annotation(ANNOTATION_CERTIFICATE_STATE, status.as_str());
                        StageOutcome::proceed()
                    }
                    Err(err) => StageOutcome::halt_with(err.into()),
                }
            }
            Err(err) => StageOutcome::halt_with(err.into()),
        }
    }
}

#[cfg(test)]
#[path = "certificate_tests.rs"]
mod certificate_tests;
