// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Ingress-like traffic resource adapter over `networking.k8s.io/v1`.

use crate::constants::WORKLOAD_DIFF_PREFIX;
use crate::errors::StatusError;
use crate::traffic::{IngressPoint, TrafficResource};
use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::networking::v1::{Ingress, IngressTLS};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Deserialize;
use serde_json::json;

/// Sync status payload published by a workload cluster for an Ingress:
/// the familiar load balancer status shape.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngressSyncStatus {
    #[serde(default)]
    load_balancer: LoadBalancer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadBalancer {
    #[serde(default)]
    ingress: Vec<IngressPoint>,
}

/// [`TrafficResource`] adapter for Ingress.
#[derive(Clone, Debug)]
pub struct TrafficIngress {
    ingress: Ingress,
}

impl TrafficIngress {
    #[must_use]
    pub fn new(ingress: Ingress) -> Self {
        TrafficIngress { ingress }
    }

    /// The wrapped Ingress, for persistence and comparison.
    #[must_use]
    pub fn inner(&self) -> &Ingress {
        &self.ingress
    }

    #[must_use]
    pub fn into_inner(self) -> Ingress {
        self.ingress
    }
}

#[async_trait]
impl TrafficResource for TrafficIngress {
    fn kind(&self) -> &'static str {
        "Ingress"
    }

    fn api_version(&self) -> &'static str {
        "networking.k8s.io/v1"
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.ingress.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.ingress.metadata
    }

    fn hosts(&self) -> Vec<String> {
        self.ingress
            .spec
            .as_ref()
            .and_then(|spec| spec.rules.as_ref())
            .map(|rules| rules.iter().filter_map(|r| r.host.clone()).collect())
            .unwrap_or_default()
    }

    fn replace_hosts(&mut self, managed_host: &str) -> Vec<String> {
        let mut replaced = Vec::new();
        let Some(spec) = self.ingress.spec.as_mut() else {
            return replaced;
        };
        if let Some(rules) = spec.rules.as_mut() {
            for rule in rules.iter_mut() {
                match rule.host.as_deref() {
                    Some(host) if host != managed_host => {
                        replaced.push(host.to_string());
                        rule.host = Some(managed_host.to_string());
                    }
                    None => rule.host = Some(managed_host.to_string()),
                    _ => {}
                }
            }
        }
        // Replaced hosts must not linger in user TLS blocks; entries left
        // with no hosts are dropped entirely.
        if let Some(tls) = spec.tls.as_mut() {
            for entry in tls.iter_mut() {
                if let Some(hosts) = entry.hosts.as_mut() {
                    hosts.retain(|h| !replaced.contains(h));
                }
            }
            tls.retain(|entry| entry.hosts.as_ref().is_some_and(|h| !h.is_empty()));
            if tls.is_empty() {
                spec.tls = None;
            }
        }
        replaced
    }

    fn apply_tls_secret(&mut self, _secret: &Secret, secret_name: &str) {
        let Some(managed_host) = self.managed_host().map(str::to_string) else {
            return;
        };
        let Some(spec) = self.ingress.spec.as_mut() else {
            return;
        };
        let entry = IngressTLS {
            hosts: Some(vec![managed_host]),
            secret_name: Some(secret_name.to_string()),
        };
        let tls = spec.tls.get_or_insert_with(Vec::new);
        match tls
            .iter_mut()
            .find(|t| t.secret_name.as_deref() == Some(secret_name))
        {
            Some(existing) => *existing = entry,
            None => tls.push(entry),
        }
    }

    fn decode_sync_status(
        &self,
        cluster: &str,
        raw: &str,
    ) -> Result<Vec<IngressPoint>, StatusError> {
        let status: IngressSyncStatus =
            serde_json::from_str(raw).map_err(|source| StatusError::MalformedStatus {
                cluster: cluster.to_string(),
                source,
            })?;
        Ok(status.load_balancer.ingress)
    }

    fn apply_transforms(&mut self, original: &Self) -> anyhow::Result<()> {
        let reconciled_spec = self.ingress.spec.clone().unwrap_or_default();
        let patches = json!([
            {
                "op": "replace",
                "path": "/rules",
                "value": reconciled_spec.rules.clone().unwrap_or_default(),
            },
            {
                "op": "replace",
                "path": "/tls",
                "value": reconciled_spec.tls.clone().unwrap_or_default(),
            },
        ]);
        let encoded =
            serde_json::to_string(&patches).context("failed to encode ingress transform patch")?;
        for target in self.sync_targets() {
            self.set_annotation(&format!("{WORKLOAD_DIFF_PREFIX}{target}"), &encoded);
        }
        // The user-declared spec is restored; clusters apply the diff.
        self.ingress.spec = original.ingress.spec.clone();
        Ok(())
    }
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod ingress_tests;
