// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Controller configuration, parsed from flags and `GLBC_*` environment
//! variables.

use crate::constants::{DEFAULT_WATCH_INTERVAL_SECS, METRICS_SERVER_BIND_ADDRESS};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the glbc controller.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "glbc",
    version,
    about = "Global load balancer controller for multi-cluster ingress"
)]
pub struct Config {
    /// Domain managed hosts are generated under.
    #[arg(long, env = "GLBC_DOMAIN", default_value = "dev.glbc.example.com")]
    pub domain: String,

    /// Base URL of the geo-IP lookup service.
    #[arg(
        long = "geo-service-url",
        env = "GLBC_GEO_SERVICE_URL",
        default_value = "http://ipwho.is"
    )]
    pub geo_service_url: String,

    /// Directory of per-IP geo JSON files consulted before the remote
    /// service.
    #[arg(long = "geo-dataset-dir", env = "GLBC_GEO_DATASET_DIR")]
    pub geo_dataset_dir: Option<PathBuf>,

    /// Seconds between re-resolutions of watched load balancer hostnames.
    #[arg(
        long = "host-watch-interval-secs",
        env = "GLBC_HOST_WATCH_INTERVAL_SECS",
        default_value_t = DEFAULT_WATCH_INTERVAL_SECS
    )]
    pub host_watch_interval_secs: u64,

    /// Bind address of the metrics HTTP server.
    #[arg(
        long = "metrics-addr",
        env = "GLBC_METRICS_ADDR",
        default_value = METRICS_SERVER_BIND_ADDRESS
    )]
    pub metrics_addr: String,

    /// Namespace certificates are issued into.
    #[arg(
        long = "certificate-namespace",
        env = "GLBC_CERTIFICATE_NAMESPACE",
        default_value = "glbc-system"
    )]
    pub certificate_namespace: String,

    /// Name of the ClusterIssuer signing managed-host certificates.
    #[arg(
        long = "certificate-issuer",
        env = "GLBC_CERTIFICATE_ISSUER",
        default_value = "glbc-ca"
    )]
    pub certificate_issuer: String,

    /// Publish per-cluster spec diffs as transform annotations instead of
    /// mutating the resource spec in place.
    #[arg(long = "advanced-scheduling", env = "GLBC_ADVANCED_SCHEDULING")]
    pub advanced_scheduling: bool,
}

impl Config {
    /// The host watch interval as a [`Duration`].
    #[must_use]
    pub fn host_watch_interval(&self) -> Duration {
        Duration::from_secs(self.host_watch_interval_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
