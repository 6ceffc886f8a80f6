// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Geo-IP lookup: maps an IP address to a continent code.
//!
//! Resolution order:
//! 1. A local static dataset (`<dataset-dir>/<ip>.json`), useful for
//!    air-gapped environments and deterministic tests.
//! 2. The remote lookup service (`GET <service>/<ip>`, ipwho.is-compatible).
//! 3. The fixed default [`crate::constants::DEFAULT_CONTINENT_CODE`] on any
//!    transport or parse failure, or when the service answers
//!    `success: false`.

use crate::constants::DEFAULT_CONTINENT_CODE;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Subset of the ipwho.is response payload we care about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoIpInfo {
    #[serde(default)]
    pub success: bool,
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

/// Continent-code resolver with static-dataset-then-remote fallback.
#[derive(Clone, Debug)]
pub struct GeoResolver {
    service_url: String,
    dataset_dir: Option<PathBuf>,
    http: reqwest::Client,
}

impl GeoResolver {
    /// Create a resolver against `service_url` (e.g. `http://ipwho.is`),
    /// consulting `dataset_dir` first when given.
    #[must_use]
    pub fn new(service_url: impl Into<String>, dataset_dir: Option<PathBuf>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        GeoResolver {
            service_url: service_url.into().trim_end_matches('/').to_string(),
            dataset_dir,
            http,
        }
    }

    /// Look up the continent code for `ip`.
    ///
    /// Never fails: every error path collapses to the default code.
    pub async fn continent_code(&self, ip: &str) -> String {
        match self.lookup(ip).await {
            Some(info) if info.success && !info.continent_code.is_empty() => info.continent_code,
            _ => DEFAULT_CONTINENT_CODE.to_string(),
        }
    }

    /// Full geo lookup for `ip`; `None` when both tiers fail.
    pub async fn lookup(&self, ip: &str) -> Option<GeoIpInfo> {
        if let Some(info) = self.lookup_local(ip).await {
            debug!(ip, code = %info.continent_code, "geo lookup served from static dataset");
            return Some(info);
        }
        self.lookup_remote(ip).await
    }

    async fn lookup_local(&self, ip: &str) -> Option<GeoIpInfo> {
        let dir = self.dataset_dir.as_ref()?;
        let data = tokio::fs::read(dir.join(format!("{ip}.json"))).await.ok()?;
        serde_json::from_slice(&data).ok()
    }

    async fn lookup_remote(&self, ip: &str) -> Option<GeoIpInfo> {
        let url = format!("{}/{ip}", self.service_url);
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(ip, error = %e, "remote geo lookup failed, using default continent");
                return None;
            }
        };
        match response.json::<GeoIpInfo>().await {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(ip, error = %e, "remote geo response did not parse, using default continent");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "geo_tests.rs"]
mod geo_tests;
