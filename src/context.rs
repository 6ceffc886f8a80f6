// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Shared context for the traffic controllers.
//!
//! Both controllers (Ingress and Route) receive an `Arc<Context>` carrying
//! the Kubernetes client, the parsed configuration, and the capability
//! implementations the pipeline stages depend on. Each traffic kind owns
//! its own host-watch registry so their trigger channels stay independent.

use crate::config::Config;
use crate::geo::GeoResolver;
use crate::net::watcher::HostsWatcher;
use crate::net::SharedHostResolver;
use crate::reconcilers::certificate::SecretStore;
use crate::reconcilers::dns::DnsRecordStore;
use crate::reconcilers::{CertificateStage, DnsStage, HostStage, Pipeline};
use crate::tls::CertProvider;
use crate::traffic::{TrafficIngress, TrafficRoute};
use kube::Client;
use std::sync::Arc;

/// Shared context passed to both traffic controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Parsed runtime configuration
    pub config: Config,

    /// Certificate issuance backend
    pub cert_provider: Arc<dyn CertProvider>,

    /// Secret persistence in end-user namespaces
    pub secrets: Arc<dyn SecretStore>,

    /// DNSRecord persistence
    pub dns_records: Arc<dyn DnsRecordStore>,

    /// Hostname resolution for load balancer targets
    pub resolver: SharedHostResolver,

    /// Geo-IP continent lookup
    pub geo: Arc<GeoResolver>,

    /// Host-watch registry feeding the Ingress controller's trigger stream
    pub ingress_watcher: Arc<HostsWatcher>,

    /// Host-watch registry feeding the Route controller's trigger stream
    pub route_watcher: Arc<HostsWatcher>,
}

impl Context {
    fn stages<T: crate::traffic::TrafficResource + 'static>(
        &self,
        watcher: &Arc<HostsWatcher>,
    ) -> Pipeline<T> {
        Pipeline::new(vec![
            Box::new(HostStage::new(self.config.domain.clone())),
            Box::new(CertificateStage::new(
                Arc::clone(&self.cert_provider),
                Arc::clone(&self.secrets),
            )),
            Box::new(DnsStage::new(
                Arc::clone(&self.dns_records),
                Arc::clone(&self.resolver),
                Arc::clone(&self.geo),
                Arc::clone(watcher),
            )),
        ])
    }

    /// The stage sequence for Ingress resources.
    #[must_use]
    pub fn ingress_pipeline(&self) -> Pipeline<TrafficIngress> {
        self.stages(&self.ingress_watcher)
    }

    /// The stage sequence for Route resources.
    #[must_use]
    pub fn route_pipeline(&self) -> Pipeline<TrafficRoute> {
        self.stages(&self.route_watcher)
    }
}
