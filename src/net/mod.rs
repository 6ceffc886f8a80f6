// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Hostname resolution capability.
//!
//! Resolving load balancer hostnames is the only network I/O on the
//! reconciliation hot path, so it lives behind the [`HostResolver`] trait:
//! production uses [`SystemResolver`] (hickory, no client-side caching so
//! address-set changes are observed promptly), tests inject scripted
//! resolvers.

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use std::net::IpAddr;
use std::sync::Arc;

pub mod watcher;

/// A resolved address for a watched host.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HostAddress {
    /// The hostname that was resolved.
    pub host: String,
    /// One address it resolved to.
    pub ip: IpAddr,
}

/// Capability to resolve a hostname to its current set of IP addresses.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `host` to its A/AAAA addresses.
    async fn lookup_ips(&self, host: &str) -> anyhow::Result<Vec<HostAddress>>;
}

/// [`HostResolver`] backed by the hickory resolver, configured from the
/// system `resolv.conf`.
pub struct SystemResolver {
    dns: TokioResolver,
}

impl SystemResolver {
    /// Build a resolver from system configuration with client-side caching
    /// disabled.
    pub fn from_system_config() -> anyhow::Result<Self> {
        let mut builder = TokioResolver::builder_tokio()?;
        builder.options_mut().cache_size = 0;
        Ok(SystemResolver {
            dns: builder.build(),
        })
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup_ips(&self, host: &str) -> anyhow::Result<Vec<HostAddress>> {
        let lookup = self.dns.lookup_ip(host).await?;
        Ok(lookup
            .iter()
            .map(|ip| HostAddress {
                host: host.to_string(),
                ip,
            })
            .collect())
    }
}

/// Convenience alias for a shared, injectable resolver.
pub type SharedHostResolver = Arc<dyn HostResolver>;
