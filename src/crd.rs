// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions for glbc.
//!
//! Two CRDs are defined here:
//!
//! - [`DNSRecord`] - the synthesized, provider-agnostic DNS record owned by a
//!   traffic resource. Its endpoint list is recomputed on every pass and an
//!   external DNS provider agent pushes it into the zone.
//! - [`Route`] - the Route-like traffic resource flavor (single host rule,
//!   edge TLS termination). The Ingress-like flavor uses the upstream
//!   `networking.k8s.io/v1` type directly.
//!
//! # Example: a synthesized endpoint
//!
//! ```rust
//! use glbc::crd::{Endpoint, ProviderSpecificProperty};
//!
//! let endpoint = Endpoint {
//!     dns_name: "na.abcd.glbc.example.com".to_string(),
//!     record_type: "A".to_string(),
//!     targets: vec!["1.2.3.4".to_string()],
//!     record_ttl: Some(60),
//!     set_identifier: Some("na.1.2.3.4".to_string()),
//!     provider_specific: vec![ProviderSpecificProperty {
//!         name: "aws/weight".to_string(),
//!         value: "120".to_string(),
//!     }],
//! };
//! assert_eq!(endpoint.set_id(), "na.1.2.3.4");
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
pub struct Condition {
    /// Type of condition. Common types include: Ready, Available, Degraded.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// A provider-specific key/value pair attached to an endpoint, carrying
/// routing policy the generic record shape cannot express (weight,
/// geolocation codes).
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProviderSpecificProperty {
    /// Property name, e.g. `aws/weight`.
    pub name: String,

    /// Property value, always a string.
    pub value: String,
}

/// A single DNS endpoint within a [`DNSRecord`].
///
/// The `set_identifier` is the stable merge key across reconciliations: it,
/// not array position, determines which endpoint a recomputed value updates
/// versus appends.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// The hostname of the DNS record.
    pub dns_name: String,

    /// Record type: A or CNAME.
    pub record_type: String,

    /// The targets the DNS record points to.
    #[serde(default)]
    pub targets: Vec<String>,

    /// TTL for the record, in seconds.
    #[serde(rename = "recordTTL", skip_serializing_if = "Option::is_none")]
    pub record_ttl: Option<i64>,

    /// Identifier distinguishing multiple endpoints with the same name;
    /// unique within the record and stable across recomputations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,

    /// Provider-specific routing properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_specific: Vec<ProviderSpecificProperty>,
}

impl Endpoint {
    /// The merge key for this endpoint: the set identifier when present,
    /// otherwise the DNS name.
    #[must_use]
    pub fn set_id(&self) -> &str {
        self.set_identifier.as_deref().unwrap_or(&self.dns_name)
    }

    /// Set (or replace) a provider-specific property by name.
    pub fn set_provider_specific(&mut self, name: &str, value: &str) {
        if let Some(prop) = self.provider_specific.iter_mut().find(|p| p.name == name) {
            prop.value = value.to_string();
        } else {
            self.provider_specific.push(ProviderSpecificProperty {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Read a provider-specific property by name.
    #[must_use]
    pub fn provider_specific(&self, name: &str) -> Option<&str> {
        self.provider_specific
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// A reference to the DNS zone an endpoint set is published into.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DNSZone {
    /// Provider-side identifier of the hosted zone.
    pub id: String,

    /// Optional domain filter restricting which names may be published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_filter: Option<String>,
}

/// `DNSRecord` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
pub struct DNSRecordStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Zones the record has been published into.
    #[serde(default)]
    pub zones: Vec<DNSZone>,
}

/// `DNSRecord` holds the full set of DNS endpoints routing traffic for one
/// managed host. It is owned by (and owner-referenced to) the traffic
/// resource it was synthesized from.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "glbc.dev",
    version = "v1alpha1",
    kind = "DNSRecord",
    namespaced,
    doc = "DNSRecord carries the geo-partitioned, weighted endpoint set synthesized for a traffic resource's managed host. An external DNS provider agent reconciles it into the hosted zone."
)]
#[kube(status = "DNSRecordStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordSpec {
    /// Ordered endpoint list; sorted by primary target value for stable,
    /// diff-friendly serialization.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// TLS termination types supported by a [`Route`].
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TLSTermination {
    /// TLS is terminated at the router; traffic to the backend is cleartext.
    #[default]
    Edge,
    /// TLS is passed through to the backend unmodified.
    Passthrough,
    /// TLS is terminated at the router and re-encrypted to the backend.
    Reencrypt,
}

/// TLS configuration for a [`Route`].
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTLSConfig {
    /// Termination policy.
    pub termination: TLSTermination,

    /// PEM-encoded private key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// PEM-encoded server certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    /// PEM-encoded CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<String>,
}

/// Backend service reference for a [`Route`].
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    /// Kind of the referenced object (only `Service` is supported).
    pub kind: String,

    /// Name of the referenced service.
    pub name: String,

    /// Relative weight against other target references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

/// `Route` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
pub struct RouteStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// `Route` is the Route-like traffic resource flavor: one host rule, an
/// optional edge TLS block, and a single backend service.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "glbc.dev",
    version = "v1alpha1",
    kind = "Route",
    namespaced,
    doc = "Route exposes a service on a hostname. glbc rewrites the host to the generated managed host and maintains its TLS certificate and DNS record."
)]
#[kube(status = "RouteStatus")]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Hostname the route is exposed on. Rewritten to the managed host once
    /// one has been assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Path prefix the route matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Backend service receiving the traffic.
    pub to: RouteTargetReference,

    /// TLS configuration; populated by the certificate stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<RouteTLSConfig>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
