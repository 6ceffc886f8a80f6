// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Route-like traffic resource adapter over the crate's own [`Route`] CRD.

use crate::constants::{
    TLS_DATA_CA_CERT, TLS_DATA_CERT, TLS_DATA_KEY, WORKLOAD_DIFF_PREFIX,
};
use crate::crd::{Route, RouteTLSConfig, TLSTermination};
use crate::errors::StatusError;
use crate::traffic::{IngressPoint, TrafficResource};
use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Deserialize;
use serde_json::json;

/// Sync status payload published by a workload cluster for a Route: a list
/// of router ingress points carrying the canonical hostname.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteSyncStatus {
    #[serde(default)]
    ingress: Vec<RouterIngress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouterIngress {
    #[serde(default)]
    router_canonical_hostname: Option<String>,
}

/// [`TrafficResource`] adapter for Route.
#[derive(Clone, Debug)]
pub struct TrafficRoute {
    route: Route,
}

impl TrafficRoute {
    #[must_use]
    pub fn new(route: Route) -> Self {
        TrafficRoute { route }
    }

    /// The wrapped Route, for persistence and comparison.
    #[must_use]
    pub fn inner(&self) -> &Route {
        &self.route
    }

    #[must_use]
    pub fn into_inner(self) -> Route {
        self.route
    }
}

#[async_trait]
impl TrafficResource for TrafficRoute {
    fn kind(&self) -> &'static str {
        "Route"
    }

    fn api_version(&self) -> &'static str {
        crate::constants::API_GROUP_VERSION
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.route.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.route.metadata
    }

    fn hosts(&self) -> Vec<String> {
        self.route.spec.host.clone().into_iter().collect()
    }

    fn replace_hosts(&mut self, managed_host: &str) -> Vec<String> {
        match self.route.spec.host.as_deref() {
            Some(host) if host != managed_host => {
                let replaced = vec![host.to_string()];
                self.route.spec.host = Some(managed_host.to_string());
                replaced
            }
            None => {
                self.route.spec.host = Some(managed_host.to_string());
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn apply_tls_secret(&mut self, secret: &Secret, _secret_name: &str) {
        let data = secret.data.clone().unwrap_or_default();
        let field = |key: &str| {
            data.get(key)
                .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
        };
        self.route.spec.tls = Some(RouteTLSConfig {
            termination: TLSTermination::Edge,
            key: field(TLS_DATA_KEY),
            certificate: field(TLS_DATA_CERT),
            ca_certificate: field(TLS_DATA_CA_CERT),
        });
    }

    fn decode_sync_status(
        &self,
        cluster: &str,
        raw: &str,
    ) -> Result<Vec<IngressPoint>, StatusError> {
        let status: RouteSyncStatus =
            serde_json::from_str(raw).map_err(|source| StatusError::MalformedStatus {
                cluster: cluster.to_string(),
                source,
            })?;
        Ok(status
            .ingress
            .into_iter()
            .map(|point| IngressPoint {
                ip: None,
                hostname: point.router_canonical_hostname,
            })
            .collect())
    }

    fn apply_transforms(&mut self, original: &Self) -> anyhow::Result<()> {
        let patches = json!([
            {
                "op": "replace",
                "path": "/host",
                "value": self.route.spec.host.clone().unwrap_or_default(),
            },
            {
                "op": "replace",
                "path": "/tls",
                "value": self.route.spec.tls.clone().unwrap_or_default(),
            },
        ]);
        let encoded =
            serde_json::to_string(&patches).context("failed to encode route transform patch")?;
        for target in self.sync_targets() {
            self.set_annotation(&format!("{WORKLOAD_DIFF_PREFIX}{target}"), &encoded);
        }
        self.route.spec = original.route.spec.clone();
        Ok(())
    }
}

#[cfg(test)]
#[path = "route_tests.rs"]
mod route_tests;
