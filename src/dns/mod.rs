// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! DNS target model and the DNS provider capability.
//!
//! A [`Target`] is one backend reported by a workload cluster: either a load
//! balancer hostname (already resolved to its IP list) or a bare IP. The
//! endpoint synthesizer in [`crate::reconcilers::dns`] partitions targets by
//! continent and turns them into `DNSRecord` endpoints.
//!
//! The [`Provider`] trait is the seam to the actual DNS backend. glbc only
//! persists `DNSRecord` objects; pushing them into a hosted zone is the
//! provider agent's job and stays behind this interface.

use crate::crd::{DNSRecord, DNSZone};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The kind of backend address a cluster reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetType {
    /// A load balancer hostname; its resolved IPs are watched for change.
    Host,
    /// A bare IP address.
    Ip,
}

/// Geographic metadata attached to a target, as published by a workload
/// cluster or derived from a geo-IP lookup.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeoMeta {
    #[serde(default)]
    pub continent: String,
    #[serde(default)]
    pub continent_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub region_code: String,
    #[serde(default)]
    pub city: String,
}

/// One distinct backend hostname/IP reported by a cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    /// Whether the backend was reported as a hostname or a bare IP.
    pub target_type: TargetType,

    /// The IP addresses traffic should be routed to.
    pub value: Vec<String>,

    /// Geo metadata for this target; an empty continent code means the
    /// synthesizer derives one from the first IP.
    pub geo: GeoMeta,
}

impl Target {
    /// A host-type target with the given resolved addresses.
    #[must_use]
    pub fn host(ips: Vec<String>, geo: GeoMeta) -> Self {
        Target {
            target_type: TargetType::Host,
            value: ips,
            geo,
        }
    }

    /// An IP-type target.
    #[must_use]
    pub fn ip(ip: String, geo: GeoMeta) -> Self {
        Target {
            target_type: TargetType::Ip,
            value: vec![ip],
            geo,
        }
    }
}

/// Capability interface to the DNS backend.
///
/// Implementations manage hosted zones only as pertains to routing: ensure
/// a record's endpoints exist, delete them, and reconcile any provider-side
/// health checks referenced by the record's annotations.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Create or update `record` in `zone`.
    async fn ensure(&self, record: &DNSRecord, zone: &DNSZone) -> anyhow::Result<()>;

    /// Delete `record` from `zone`.
    async fn delete(&self, record: &DNSRecord, zone: &DNSZone) -> anyhow::Result<()>;

    /// Reconcile provider-side health checks for `record`.
    async fn reconcile_health_checks(&self, record: &DNSRecord) -> anyhow::Result<()>;
}

/// A no-op provider for tests and provider-less deployments.
#[derive(Clone, Copy, Debug, Default)]
pub struct FakeProvider;

#[async_trait]
impl Provider for FakeProvider {
    async fn ensure(&self, _record: &DNSRecord, _zone: &DNSZone) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete(&self, _record: &DNSRecord, _zone: &DNSZone) -> anyhow::Result<()> {
        Ok(())
    }

    async fn reconcile_health_checks(&self, _record: &DNSRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
