// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! The polymorphic traffic resource capability set.
//!
//! glbc manages two structurally different kinds - Ingress-like and
//! Route-like - through one trait, [`TrafficResource`]. Adapters compose
//! over the concrete type (no shared accessor wrapper): see
//! [`ingress::TrafficIngress`] and [`route::TrafficRoute`].
//!
//! Workload clusters publish their view of the resource through annotations:
//! `status.workload.glbc.dev/<cluster>` carries the JSON sync status with
//! the cluster's ingress points, `deletion.workload.glbc.dev/<cluster>`
//! marks a cluster as draining, and `geo.workload.glbc.dev/<cluster>`
//! optionally pre-supplies geo metadata for that cluster's targets.

use crate::constants::{
    ANNOTATION_MANAGED_HOST, ANNOTATION_ORIGIN_CLUSTER, WORKLOAD_DELETING_PREFIX,
    WORKLOAD_GEO_PREFIX, WORKLOAD_STATE_PREFIX, WORKLOAD_STATUS_PREFIX,
};
use crate::dns::{GeoMeta, Target};
use crate::errors::StatusError;
use crate::net::HostResolver;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

pub mod ingress;
pub mod route;

pub use ingress::TrafficIngress;
pub use route::TrafficRoute;

/// Namespace/name identity of a traffic resource; the unit of reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        ObjectKey {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One ingress point reported by a workload cluster's sync status: a load
/// balancer IP, a canonical hostname, or both.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Capability set shared by both traffic resource flavors.
///
/// The pipeline stages only ever talk to this trait; everything
/// kind-specific (host rules, TLS block shape, sync-status payload,
/// transform patches) lives in the adapters.
#[async_trait]
pub trait TrafficResource: Send + Sync {
    /// Kind name, e.g. `Ingress` or `Route`.
    fn kind(&self) -> &'static str;

    /// API version the owner reference should carry.
    fn api_version(&self) -> &'static str;

    /// Object metadata (shared by both flavors).
    fn metadata(&self) -> &ObjectMeta;

    /// Mutable object metadata.
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// All user-declared hosts across the resource's routing rules.
    fn hosts(&self) -> Vec<String>;

    /// Rewrite every routing rule's host to `managed_host`, strip replaced
    /// hosts from TLS host lists, and return the replaced custom hosts.
    fn replace_hosts(&mut self, managed_host: &str) -> Vec<String>;

    /// Populate the resource's TLS block from the issued certificate secret.
    fn apply_tls_secret(&mut self, secret: &Secret, secret_name: &str);

    /// Decode one cluster's raw sync-status annotation into ingress points.
    fn decode_sync_status(&self, cluster: &str, raw: &str)
        -> Result<Vec<IngressPoint>, StatusError>;

    /// Record the diff between `self` (reconciled) and `original` (as the
    /// user declared it) as per-cluster JSON-patch annotations, restoring
    /// the original spec in place.
    fn apply_transforms(&mut self, original: &Self) -> anyhow::Result<()>
    where
        Self: Sized;

    // ------------------------------------------------------------------
    // Defaults over metadata
    // ------------------------------------------------------------------

    fn name(&self) -> String {
        self.metadata().name.clone().unwrap_or_default()
    }

    fn namespace(&self) -> String {
        self.metadata().namespace.clone().unwrap_or_default()
    }

    fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace(), self.name())
    }

    fn uid(&self) -> Option<String> {
        self.metadata().uid.clone()
    }

    fn deletion_timestamp(&self) -> Option<&Time> {
        self.metadata().deletion_timestamp.as_ref()
    }

    /// True once the API server has marked the resource for deletion.
    fn is_deleted(&self) -> bool {
        self.deletion_timestamp().is_some()
    }

    fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata()
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    fn has_annotation(&self, key: &str) -> bool {
        self.annotation(key).is_some()
    }

    fn set_annotation(&mut self, key: &str, value: &str) {
        self.metadata_mut()
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
    }

    fn remove_annotation(&mut self, key: &str) {
        if let Some(annotations) = self.metadata_mut().annotations.as_mut() {
            annotations.remove(key);
        }
    }

    fn add_finalizer(&mut self, finalizer: &str) {
        let finalizers = self.metadata_mut().finalizers.get_or_insert_with(Vec::new);
        if !finalizers.iter().any(|f| f == finalizer) {
            finalizers.push(finalizer.to_string());
        }
    }

    fn remove_finalizer(&mut self, finalizer: &str) {
        if let Some(finalizers) = self.metadata_mut().finalizers.as_mut() {
            finalizers.retain(|f| f != finalizer);
        }
    }

    fn finalizers(&self) -> Vec<String> {
        self.metadata().finalizers.clone().unwrap_or_default()
    }

    /// The managed host annotation value, if one has been assigned.
    fn managed_host(&self) -> Option<&str> {
        self.annotation(ANNOTATION_MANAGED_HOST)
    }

    /// The cluster the resource originates from, or empty when unset.
    fn origin_cluster(&self) -> String {
        self.annotation(ANNOTATION_ORIGIN_CLUSTER)
            .unwrap_or_default()
            .to_string()
    }

    /// An owner reference pointing at this resource, for objects it owns
    /// (DNSRecord, copied TLS secret).
    fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: self.api_version().to_string(),
            kind: self.kind().to_string(),
            name: self.name(),
            uid: self.uid().unwrap_or_default(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    // ------------------------------------------------------------------
    // Workload cluster views
    // ------------------------------------------------------------------

    /// Cluster IDs this resource is scheduled onto, from the sync-state
    /// labels.
    fn sync_targets(&self) -> Vec<String> {
        self.metadata()
            .labels
            .as_ref()
            .map(|labels| {
                labels
                    .iter()
                    .filter(|(k, v)| k.starts_with(WORKLOAD_STATE_PREFIX) && v.as_str() == "Sync")
                    .map(|(k, _)| k[WORKLOAD_STATE_PREFIX.len()..].to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Raw per-cluster sync-status annotations as (cluster, payload) pairs.
    fn cluster_statuses(&self) -> Vec<(String, String)> {
        self.metadata()
            .annotations
            .as_ref()
            .map(|annotations| {
                annotations
                    .iter()
                    .filter(|(k, _)| k.starts_with(WORKLOAD_STATUS_PREFIX))
                    .map(|(k, v)| (k[WORKLOAD_STATUS_PREFIX.len()..].to_string(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `cluster` carries the deletion-in-progress marker.
    fn is_cluster_deleting(&self, cluster: &str) -> bool {
        self.has_annotation(&format!("{WORKLOAD_DELETING_PREFIX}{cluster}"))
    }

    /// Geo metadata pre-supplied for `cluster`, or the empty default.
    fn cluster_geo(&self, cluster: &str) -> GeoMeta {
        self.annotation(&format!("{WORKLOAD_GEO_PREFIX}{cluster}"))
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    /// Derive, per workload cluster, the set of network targets currently
    /// backing this resource.
    ///
    /// Hostname ingress points are resolved through `resolver` - the only
    /// network I/O on the hot path. Malformed status annotations are logged
    /// and that cluster's contribution skipped; resolution failures
    /// propagate so the pass is retried with backoff.
    async fn targets(
        &self,
        resolver: &dyn HostResolver,
    ) -> anyhow::Result<BTreeMap<String, BTreeMap<String, Target>>> {
        let mut all: BTreeMap<String, BTreeMap<String, Target>> = BTreeMap::new();
        for (cluster, raw) in self.cluster_statuses() {
            let points = match self.decode_sync_status(&cluster, &raw) {
                Ok(points) => points,
                Err(e) => {
                    warn!(cluster = %cluster, resource = %self.key(), error = %e,
                        "skipping cluster with undecodable sync status");
                    continue;
                }
            };
            let geo = self.cluster_geo(&cluster);
            let mut targets = BTreeMap::new();
            for point in points {
                if let Some(host) = point.hostname.as_deref().filter(|h| !h.is_empty()) {
                    let ips = resolver
                        .lookup_ips(host)
                        .await
                        .map_err(|source| StatusError::HostResolution {
                            host: host.to_string(),
                            source,
                        })?
                        .into_iter()
                        .map(|addr| addr.ip.to_string())
                        .collect();
                    targets.insert(host.to_string(), Target::host(ips, geo.clone()));
                } else if let Some(ip) = point.ip.filter(|ip| !ip.is_empty()) {
                    targets.insert(ip.clone(), Target::ip(ip, geo.clone()));
                }
            }
            all.insert(cluster, targets);
        }
        Ok(all)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
