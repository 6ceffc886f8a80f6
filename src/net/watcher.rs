// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Background re-resolution of watched load balancer hostnames.
//!
//! Each watched (resource, hostname) pair runs an independent cancellable
//! task that re-resolves the hostname on a fixed interval and compares the
//! address set to the last observed one. On change it only *signals* the
//! owning resource's key on a channel wired into the controller's trigger
//! stream; it never reconciles directly, so polling and reconciliation
//! never contend on anything but the registry mutex.

use crate::net::SharedHostResolver;
use crate::traffic::ObjectKey;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct WatchId {
    key: ObjectKey,
    host: String,
}

/// Registry of active host watches, shared by all reconciliations of one
/// traffic kind.
pub struct HostsWatcher {
    resolver: SharedHostResolver,
    interval: Duration,
    notify: mpsc::UnboundedSender<ObjectKey>,
    watches: Mutex<HashMap<WatchId, JoinHandle<()>>>,
}

impl HostsWatcher {
    /// Create a watcher and the receiver carrying change signals.
    #[must_use]
    pub fn new(
        resolver: SharedHostResolver,
        interval: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ObjectKey>) {
        let (notify, receiver) = mpsc::unbounded_channel();
        (
            Arc::new(HostsWatcher {
                resolver,
                interval,
                notify,
                watches: Mutex::new(HashMap::new()),
            }),
            receiver,
        )
    }

    /// Start watching `host` on behalf of `key`. Idempotent; returns false
    /// when the watch already exists.
    pub fn start_watching(&self, key: &ObjectKey, host: &str) -> bool {
        let id = WatchId {
            key: key.clone(),
            host: host.to_string(),
        };
        let mut watches = self.watches.lock().expect("watch registry poisoned");
        if watches.contains_key(&id) {
            return false;
        }
        debug!(resource = %key, host, "starting host watch");
        let handle = tokio::spawn(watch_loop(
            Arc::clone(&self.resolver),
            self.interval,
            id.key.clone(),
            id.host.clone(),
            self.notify.clone(),
        ));
        watches.insert(id, handle);
        true
    }

    /// Stop watching `host` for `key`, aborting its task.
    pub fn stop_watching(&self, key: &ObjectKey, host: &str) {
        let id = WatchId {
            key: key.clone(),
            host: host.to_string(),
        };
        if let Some(handle) = self
            .watches
            .lock()
            .expect("watch registry poisoned")
            .remove(&id)
        {
            debug!(resource = %key, host, "stopping host watch");
            handle.abort();
        }
    }

    /// Stop every watch belonging to `key`; used when the resource is
    /// deleted.
    pub fn stop_watching_all(&self, key: &ObjectKey) {
        let mut watches = self.watches.lock().expect("watch registry poisoned");
        let ids: Vec<WatchId> = watches
            .keys()
            .filter(|id| &id.key == key)
            .cloned()
            .collect();
        for id in ids {
            if let Some(handle) = watches.remove(&id) {
                debug!(resource = %id.key, host = %id.host, "stopping host watch");
                handle.abort();
            }
        }
    }

    /// Hostnames currently watched for `key`.
    #[must_use]
    pub fn watched_hosts(&self, key: &ObjectKey) -> Vec<String> {
        self.watches
            .lock()
            .expect("watch registry poisoned")
            .keys()
            .filter(|id| &id.key == key)
            .map(|id| id.host.clone())
            .collect()
    }
}

async fn watch_loop(
    resolver: SharedHostResolver,
    interval: Duration,
    key: ObjectKey,
    host: String,
    notify: mpsc::UnboundedSender<ObjectKey>,
) {
    // Seed the baseline so the first tick only signals a genuine change.
    let mut last = resolve_set(&resolver, &host).await;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        // A failed resolution keeps the previous baseline; a transient
        // resolver outage is not an address-set change.
        let Some(current) = resolve_set(&resolver, &host).await else {
            continue;
        };
        if last.as_ref() != Some(&current) {
            debug!(resource = %key, host = %host, addresses = ?current,
                "watched host address set changed, requeueing resource");
            last = Some(current);
            if notify.send(key.clone()).is_err() {
                // Controller is shutting down.
                return;
            }
        }
    }
}

async fn resolve_set(resolver: &SharedHostResolver, host: &str) -> Option<BTreeSet<String>> {
    match resolver.lookup_ips(host).await {
        Ok(addresses) => Some(
            addresses
                .into_iter()
                .map(|addr| addr.ip.to_string())
                .collect(),
        ),
        Err(e) => {
            warn!(host, error = %e, "host watch resolution failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod watcher_tests;
