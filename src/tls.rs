// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! TLS certificate capability.
//!
//! The certificate backend is an external collaborator; the pipeline only
//! depends on the [`CertProvider`] trait. [`CertManagerProvider`] is the
//! production implementation, driving `cert-manager.io/v1` Certificate
//! objects through the dynamic API in a dedicated issuance namespace.

use crate::constants::{ANNOTATION_TRAFFIC_KEY, LABEL_MANAGED, TLS_SECRET_NAME_PREFIX};
use crate::errors::CertError;
use crate::traffic::TrafficResource;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{ApiResource, DeleteParams, DynamicObject, GroupVersionKind, PostParams};
use kube::{Api, Client};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Issuance state of a certificate as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CertStatus {
    /// Issuance still in flight.
    Pending,
    /// The certificate secret is available.
    Ready,
}

impl CertStatus {
    /// The value recorded in the certificate-status annotation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CertStatus::Pending => "pending",
            CertStatus::Ready => "ready",
        }
    }
}

/// A request for a certificate covering one managed host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CertificateRequest {
    /// Deterministic certificate name, also the name of the issued secret.
    pub name: String,
    /// The managed host the certificate must cover.
    pub host: String,
    /// Labels applied to the certificate object.
    pub labels: BTreeMap<String, String>,
    /// Annotations applied to the certificate object (includes the owning
    /// resource's key).
    pub annotations: BTreeMap<String, String>,
}

impl CertificateRequest {
    /// Build the request for a traffic resource.
    ///
    /// The name is derived from the resource's origin cluster, namespace and
    /// name with characters invalid in RFC 1123 subdomains stripped.
    #[must_use]
    pub fn for_resource(resource: &dyn TrafficResource) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_MANAGED.to_string(), "true".to_string());
        let mut annotations = BTreeMap::new();
        annotations.insert(ANNOTATION_TRAFFIC_KEY.to_string(), resource.key().to_string());
        CertificateRequest {
            name: certificate_name(
                &resource.origin_cluster(),
                &resource.namespace(),
                &resource.name(),
            ),
            host: resource.managed_host().unwrap_or_default().to_string(),
            labels,
            annotations,
        }
    }
}

/// Deterministic certificate name for (cluster, namespace, name), with `:`
/// stripped so the result is a valid RFC 1123 subdomain. An empty origin
/// cluster contributes nothing rather than a leading dash.
#[must_use]
pub fn certificate_name(cluster: &str, namespace: &str, name: &str) -> String {
    [cluster, namespace, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-")
        .replace(':', "")
}

/// Name of the TLS secret copied into the end-user namespace.
#[must_use]
pub fn tls_secret_name(resource_name: &str) -> String {
    format!("{TLS_SECRET_NAME_PREFIX}{resource_name}")
}

/// Capability interface to the certificate-issuance backend.
#[async_trait]
pub trait CertProvider: Send + Sync {
    /// Request issuance; [`CertError::AlreadyExists`] on every pass after
    /// the first.
    async fn create(&self, request: &CertificateRequest) -> Result<(), CertError>;

    /// Re-issue with updated parameters.
    async fn update(&self, request: &CertificateRequest) -> Result<(), CertError>;

    /// Tear the certificate down; [`CertError::NotFound`] when it is gone.
    async fn delete(&self, request: &CertificateRequest) -> Result<(), CertError>;

    /// Fetch the issued secret; [`CertError::NotReady`] while issuance is
    /// pending.
    async fn certificate_secret(&self, request: &CertificateRequest) -> Result<Secret, CertError>;

    /// Current issuance state.
    async fn certificate_status(&self, request: &CertificateRequest)
        -> Result<CertStatus, CertError>;
}

/// [`CertProvider`] backed by cert-manager Certificates in a dedicated
/// issuance namespace.
#[derive(Clone)]
pub struct CertManagerProvider {
    client: Client,
    namespace: String,
    issuer: String,
    resource: ApiResource,
}

impl CertManagerProvider {
    #[must_use]
    pub fn new(client: Client, namespace: impl Into<String>, issuer: impl Into<String>) -> Self {
        let gvk = GroupVersionKind::gvk("cert-manager.io", "v1", "Certificate");
        CertManagerProvider {
            client,
            namespace: namespace.into(),
            issuer: issuer.into(),
            resource: ApiResource::from_gvk(&gvk),
        }
    }

    fn api(&self) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &self.namespace, &self.resource)
    }

    fn certificate_body(&self, request: &CertificateRequest) -> DynamicObject {
        let mut object = DynamicObject::new(&request.name, &self.resource).data(json!({
            "spec": {
                "secretName": request.name,
                "dnsNames": [request.host],
                "issuerRef": {
                    "name": self.issuer,
                    "kind": "ClusterIssuer",
                },
            }
        }));
        object.metadata.namespace = Some(self.namespace.clone());
        object.metadata.labels = Some(request.labels.clone());
        object.metadata.annotations = Some(request.annotations.clone());
        object
    }

    fn map_kube_error(name: &str, err: kube::Error) -> CertError {
        match &err {
            kube::Error::Api(response) if response.code == 409 => CertError::AlreadyExists {
                name: name.to_string(),
            },
            kube::Error::Api(response) if response.code == 404 => CertError::NotFound {
                name: name.to_string(),
            },
            _ => CertError::Backend {
                name: name.to_string(),
                source: err.into(),
            },
        }
    }

    async fn is_ready(&self, request: &CertificateRequest) -> Result<bool, CertError> {
        let certificate = self
            .api()
            .get(&request.name)
            .await
            .map_err(|e| Self::map_kube_error(&request.name, e))?;
        Ok(certificate_ready(&certificate))
    }
}

/// True when the Certificate carries a `Ready=True` status condition.
fn certificate_ready(certificate: &DynamicObject) -> bool {
    certificate
        .data
        .pointer("/status/conditions")
        .and_then(|conditions| conditions.as_array())
        .is_some_and(|conditions| {
            conditions.iter().any(|condition| {
                condition.get("type").and_then(|t| t.as_str()) == Some("Ready")
                    && condition.get("status").and_then(|s| s.as_str()) == Some("True")
            })
        })
}

#[async_trait]
impl CertProvider for CertManagerProvider {
    async fn create(&self, request: &CertificateRequest) -> Result<(), CertError> {
        debug!(certificate = %request.name, host = %request.host, "requesting certificate");
        self.api()
            .create(&PostParams::default(), &self.certificate_body(request))
            .await
            .map(|_| ())
            .map_err(|e| Self::map_kube_error(&request.name, e))
    }

    async fn update(&self, request: &CertificateRequest) -> Result<(), CertError> {
        self.api()
            .replace(
                &request.name,
                &PostParams::default(),
                &self.certificate_body(request),
            )
            .await
            .map(|_| ())
            .map_err(|e| Self::map_kube_error(&request.name, e))
    }

    async fn delete(&self, request: &CertificateRequest) -> Result<(), CertError> {
        self.api()
            .delete(&request.name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| Self::map_kube_error(&request.name, e))
    }

    async fn certificate_secret(&self, request: &CertificateRequest) -> Result<Secret, CertError> {
        if !self.is_ready(request).await? {
            return Err(CertError::NotReady {
                name: request.name.clone(),
            });
        }
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        secrets
            .get(&request.name)
            .await
            .map_err(|e| Self::map_kube_error(&request.name, e))
    }

    async fn certificate_status(
        &self,
        request: &CertificateRequest,
    ) -> Result<CertStatus, CertError> {
        if self.is_ready(request).await? {
            Ok(CertStatus::Ready)
        } else {
            Ok(CertStatus::Pending)
        }
    }
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tls_tests;
