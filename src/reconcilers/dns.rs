// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! DNS reconciliation: target extraction and endpoint synthesis.
//!
//! The stage derives the current backend set from the per-cluster sync
//! status annotations, partitions it by continent, and synthesizes the
//! owned `DNSRecord`'s endpoint list:
//!
//! - per continent, a CNAME on the managed host pointing at a
//!   continent-qualified name, tagged with the continent code
//! - one `default` CNAME on the lexicographically first continent as the
//!   catch-all for resolvers outside every known continent
//! - per backend IP, a weighted A record under the continent-qualified
//!   name
//!
//! Endpoints merge by set identifier: recomputed values update existing
//! entries in place, new ones append, and entries whose identifier is gone
//! from the computation are dropped. The final list is sorted by primary
//! target so identical inputs serialize identically and no-op passes issue
//! no update.
//!
//! Clusters carrying the deletion marker keep receiving traffic only while
//! no live cluster has reported a target yet.

use crate::constants::{
    ANNOTATION_HEALTH_CHECK_PREFIX, ANNOTATION_TRAFFIC_KEY, DEFAULT_ENDPOINT_TTL_SECS,
    MAX_ENDPOINT_WEIGHT, PROVIDER_SPECIFIC_GEO_CONTINENT, PROVIDER_SPECIFIC_GEO_COUNTRY,
    PROVIDER_SPECIFIC_WEIGHT,
};
use crate::crd::{DNSRecord, DNSRecordSpec, Endpoint};
use crate::dns::{Target, TargetType};
use crate::geo::GeoResolver;
use crate::metrics;
use crate::net::watcher::HostsWatcher;
use crate::net::SharedHostResolver;
use crate::reconcilers::{StageOutcome, TrafficStage};
use crate::traffic::TrafficResource;
use async_trait::async_trait;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Capability to persist `DNSRecord` objects.
#[async_trait]
pub trait DnsRecordStore: Send + Sync {
    /// Fetch a record; `None` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<DNSRecord>>;

    /// Create the record, returning it as persisted.
    async fn create(&self, record: &DNSRecord) -> anyhow::Result<DNSRecord>;

    /// Replace the record.
    async fn update(&self, record: &DNSRecord) -> anyhow::Result<DNSRecord>;

    /// Delete the record, tolerating not-found.
    async fn delete(&self, namespace: &str, name: &str) -> anyhow::Result<()>;
}

/// [`DnsRecordStore`] over the Kubernetes API.
#[derive(Clone)]
pub struct KubeDnsRecordStore {
    client: Client,
}

impl KubeDnsRecordStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        KubeDnsRecordStore { client }
    }

    fn api(&self, namespace: &str) -> Api<DNSRecord> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl DnsRecordStore for KubeDnsRecordStore {
    async fn get(&self, namespace: &str, name: &str) -> anyhow::Result<Option<DNSRecord>> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn create(&self, record: &DNSRecord) -> anyhow::Result<DNSRecord> {
        let namespace = record.metadata.namespace.clone().unwrap_or_default();
        Ok(self
            .api(&namespace)
            .create(&PostParams::default(), record)
            .await?)
    }

    async fn update(&self, record: &DNSRecord) -> anyhow::Result<DNSRecord> {
        let namespace = record.metadata.namespace.clone().unwrap_or_default();
        let name = record.metadata.name.clone().unwrap_or_default();
        Ok(self
            .api(&namespace)
            .replace(&name, &PostParams::default(), record)
            .await?)
    }

    async fn delete(&self, namespace: &str, name: &str) -> anyhow::Result<()> {
        match self.api(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Pipeline stage synthesizing and persisting the owned `DNSRecord`.
pub struct DnsStage {
    store: Arc<dyn DnsRecordStore>,
    resolver: SharedHostResolver,
    geo: Arc<GeoResolver>,
    watcher: Arc<HostsWatcher>,
}

impl DnsStage {
    #[must_use]
    pub fn new(
        store: Arc<dyn DnsRecordStore>,
        resolver: SharedHostResolver,
        geo: Arc<GeoResolver>,
        watcher: Arc<HostsWatcher>,
    ) -> Self {
        DnsStage {
            store,
            resolver,
            geo,
            watcher,
        }
    }

    fn new_record_for<T: TrafficResource>(resource: &T) -> DNSRecord {
        let mut record = DNSRecord::new(&resource.name(), DNSRecordSpec::default());
        record.metadata.namespace = Some(resource.namespace());
        record.metadata.owner_references = Some(vec![resource.owner_reference()]);
        let annotations = record.metadata.annotations.get_or_insert_with(BTreeMap::new);
        annotations.insert(ANNOTATION_TRAFFIC_KEY.to_string(), resource.key().to_string());
        copy_health_annotations(resource, &mut record);
        record
    }
}

/// Copy `health.glbc.dev/`-prefixed annotations from the traffic resource
/// onto the record, where the provider agent picks them up.
fn copy_health_annotations<T: TrafficResource>(resource: &T, record: &mut DNSRecord) {
    let source = resource.metadata().annotations.clone().unwrap_or_default();
    let annotations = record.metadata.annotations.get_or_insert_with(BTreeMap::new);
    for (key, value) in source {
        if key.starts_with(ANNOTATION_HEALTH_CHECK_PREFIX) {
            annotations.insert(key, value);
        }
    }
}

#[async_trait]
impl<T: TrafficResource> TrafficStage<T> for DnsStage {
    fn name(&self) -> &'static str {
        "dns"
    }

    async fn reconcile(&self, resource: &mut T) -> StageOutcome {
        let key = resource.key();
        if resource.is_deleted() {
            self.watcher.stop_watching_all(&key);
            if let Err(err) = self.store.delete(&resource.namespace(), &resource.name()).await {
                return StageOutcome::halt_with(err);
            }
            return StageOutcome::proceed();
        }

        let Some(managed_host) = resource.managed_host().map(str::to_string) else {
            return StageOutcome::proceed();
        };

        let per_cluster = match resource.targets(self.resolver.as_ref()).await {
            Ok(targets) => targets,
            Err(err) => return StageOutcome::proceed_with(err),
        };

        // Partition backends into live and draining clusters; hostnames on
        // live clusters are registered for re-resolution.
        let mut active_ips: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut deleting_ips: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut active_meta: BTreeMap<String, Target> = BTreeMap::new();
        let mut watched: BTreeSet<String> = BTreeSet::new();
        for (cluster, targets) in per_cluster {
            if resource.is_cluster_deleting(&cluster) {
                for (host, target) in targets {
                    deleting_ips.entry(host).or_default().extend(target.value);
                }
                continue;
            }
            for (host, target) in targets {
                if target.target_type == TargetType::Host {
                    self.watcher.start_watching(&key, &host);
                    watched.insert(host.clone());
                }
                active_ips
                    .entry(host.clone())
                    .or_default()
                    .extend(target.value.clone());
                active_meta.insert(host, target);
            }
        }

        // Until a live cluster reports a target, keep routing to the
        // draining clusters rather than dropping traffic.
        if active_ips.is_empty() && !deleting_ips.is_empty() {
            debug!(resource = %key,
                "no live targets yet, keeping the draining clusters' targets");
            active_ips = deleting_ips;
        }

        for host in self.watcher.watched_hosts(&key) {
            if !watched.contains(&host) {
                self.watcher.stop_watching(&key, &host);
            }
        }

        let existing = match self.store.get(&resource.namespace(), &resource.name()).await {
            Ok(existing) => existing,
            Err(err) => return StageOutcome::halt_with(err),
        };

        match existing {
            None => {
                let mut record = Self::new_record_for(resource);
                record.spec.endpoints =
                    synthesize_endpoints(&managed_host, &active_ips, &active_meta, &[], &self.geo)
                        .await;
                if record.spec.endpoints.is_empty() {
                    return StageOutcome::proceed();
                }
                info!(resource = %key, record = %resource.name(),
                    endpoints = record.spec.endpoints.len(), "creating DNSRecord");
                match self.store.create(&record).await {
                    Ok(created) => {
                        if let (Some(admitted), Some(born)) = (
                            created.metadata.creation_timestamp.as_ref(),
                            resource.metadata().creation_timestamp.as_ref(),
                        ) {
                            let elapsed =
                                (admitted.0.as_millisecond() - born.0.as_millisecond()) as f64
                                    / 1000.0;
                            metrics::observe_time_to_admission(elapsed);
                        }
                        StageOutcome::proceed()
                    }
                    Err(err) => StageOutcome::proceed_with(err),
                }
            }
            Some(record) => {
                let mut updated = record.clone();
                updated.spec.endpoints = synthesize_endpoints(
                    &managed_host,
                    &active_ips,
                    &active_meta,
                    &record.spec.endpoints,
                    &self.geo,
                )
                .await;
                copy_health_annotations(resource, &mut updated);
                let changed = updated.spec.endpoints != record.spec.endpoints
                    || updated.metadata.annotations != record.metadata.annotations;
                if changed {
                    info!(resource = %key, record = %resource.name(),
                        endpoints = updated.spec.endpoints.len(), "updating DNSRecord");
                    if let Err(err) = self.store.update(&updated).await {
                        return StageOutcome::halt_with(err);
                    }
                } else {
                    debug!(resource = %key, "DNSRecord unchanged");
                }
                StageOutcome::proceed()
            }
        }
    }
}

/// Weight for one A record when `backends` backends share a continent
/// bucket.
///
/// Approximates an even split of a fixed allowance: saturates to 1 once the
/// backend count exceeds the allowance, and does not sum to a fixed total
/// when the count does not divide it evenly.
#[must_use]
pub fn endpoint_weight(backends: usize) -> String {
    let backends = backends.clamp(1, MAX_ENDPOINT_WEIGHT);
    (MAX_ENDPOINT_WEIGHT / backends).to_string()
}

/// The continent-qualified variant of `managed_host`: the continent code,
/// lowercased, is spliced in after the first label.
#[must_use]
pub fn continent_qualified(managed_host: &str, continent_code: &str) -> String {
    let code = continent_code.to_lowercase();
    match managed_host.split_once('.') {
        Some((first, rest)) => format!("{first}.{code}.{rest}"),
        None => format!("{managed_host}.{code}"),
    }
}

/// Synthesize the full endpoint list for `managed_host` from the merged
/// target map.
///
/// `target_ips` maps each backend host/IP to its resolved address list;
/// `target_meta` carries per-backend geo metadata where a cluster supplied
/// it, otherwise the continent is derived from the backend's first address.
/// `current` is the previously persisted list, merged into by set
/// identifier.
pub async fn synthesize_endpoints(
    managed_host: &str,
    target_ips: &BTreeMap<String, Vec<String>>,
    target_meta: &BTreeMap<String, Target>,
    current: &[Endpoint],
    geo: &GeoResolver,
) -> Vec<Endpoint> {
    // Continent code -> backend host -> addresses. Buckets iterate in
    // ascending code order so the output is deterministic.
    let mut buckets: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for (host, ips) in target_ips {
        let Some(first_ip) = ips.first() else {
            continue;
        };
        let supplied = target_meta
            .get(host)
            .map(|t| t.geo.continent_code.clone())
            .filter(|code| !code.is_empty());
        let code = match supplied {
            Some(code) => code,
            None => geo.continent_code(first_ip).await,
        };
        buckets
            .entry(code)
            .or_default()
            .insert(host.clone(), ips.clone());
    }

    let current_by_id: BTreeMap<&str, &Endpoint> =
        current.iter().map(|e| (e.set_id(), e)).collect();
    let base = |set_id: &str| -> Endpoint {
        current_by_id.get(set_id).map(|e| (*e).clone()).unwrap_or(Endpoint {
            set_identifier: Some(set_id.to_string()),
            ..Endpoint::default()
        })
    };

    let first_code = buckets.keys().next().cloned();
    let mut endpoints = Vec::new();
    for (code, backends) in &buckets {
        let continent_name = continent_qualified(managed_host, code);

        let mut cname = base(&continent_name);
        cname.dns_name = managed_host.to_string();
        cname.record_type = "CNAME".to_string();
        cname.targets = vec![continent_name.clone()];
        cname.record_ttl = Some(DEFAULT_ENDPOINT_TTL_SECS);
        cname.set_provider_specific(PROVIDER_SPECIFIC_GEO_CONTINENT, code);
        endpoints.push(cname);

        // The first continent also answers for resolvers that match no
        // known continent.
        if first_code.as_deref() == Some(code) {
            let mut fallback = base("default");
            fallback.dns_name = managed_host.to_string();
            fallback.record_type = "CNAME".to_string();
            fallback.targets = vec![continent_name.clone()];
            fallback.record_ttl = Some(DEFAULT_ENDPOINT_TTL_SECS);
            fallback.set_provider_specific(PROVIDER_SPECIFIC_GEO_COUNTRY, "*");
            endpoints.push(fallback);
        }

        let weight = endpoint_weight(backends.len());
        for ips in backends.values() {
            for ip in ips {
                let set_id = format!("{}.{ip}", code.to_lowercase());
                let mut a_record = base(&set_id);
                a_record.dns_name = continent_name.clone();
                a_record.record_type = "A".to_string();
                a_record.targets = vec![ip.clone()];
                a_record.record_ttl = Some(DEFAULT_ENDPOINT_TTL_SECS);
                a_record.provider_specific.clear();
                a_record.set_provider_specific(PROVIDER_SPECIFIC_WEIGHT, &weight);
                endpoints.push(a_record);
            }
        }
    }

    endpoints.sort_by(|a, b| a.targets.first().cmp(&b.targets.first()));
    endpoints
}

#[cfg(test)]
#[path = "dns_tests.rs"]
mod dns_tests;
