// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Managed host assignment.
//!
//! Each traffic resource is assigned exactly one generated hostname under
//! the managed domain, recorded in an annotation. The annotation is written
//! once and never changed for the life of the resource; everything
//! downstream (certificate, DNS record) keys off it, so a fresh assignment
//! stops the pass to get the annotation persisted before any dependent
//! object is created against it.

use crate::constants::{ANNOTATION_CUSTOM_HOST_REPLACED, ANNOTATION_MANAGED_HOST};
use crate::reconcilers::{StageOutcome, TrafficStage};
use crate::traffic::TrafficResource;
use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

/// Pipeline stage assigning the managed host and rewriting user hosts.
pub struct HostStage {
    domain: String,
}

impl HostStage {
    /// Stage generating hosts under `domain`.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        HostStage {
            domain: domain.into(),
        }
    }

    /// Generate a fresh `<id>.<domain>` host. The id is a time-ordered
    /// unique identifier rendered without separators, so it is DNS-safe.
    fn generate_host(&self) -> String {
        format!("{}.{}", Uuid::now_v7().simple(), self.domain)
    }
}

#[async_trait]
impl<T: TrafficResource> TrafficStage<T> for HostStage {
    fn name(&self) -> &'static str {
        "host"
    }

    async fn reconcile(&self, resource: &mut T) -> StageOutcome {
        if resource.is_deleted() {
            return StageOutcome::proceed();
        }

        let Some(managed_host) = resource.managed_host().map(str::to_string) else {
            let generated = self.generate_host();
            info!(kind = resource.kind(), resource = %resource.key(), host = %generated,
                "assigning managed host");
            resource.set_annotation(ANNOTATION_MANAGED_HOST, &generated);
            // The host must be persisted before the certificate and DNS
            // stages run against it, so this pass ends here.
            return StageOutcome::halt();
        };

        let replaced = resource.replace_hosts(&managed_host);
        if !replaced.is_empty() {
            debug!(resource = %resource.key(), replaced = ?replaced,
                "replaced custom hosts with the managed host");
            resource.set_annotation(ANNOTATION_CUSTOM_HOST_REPLACED, &replaced.join(","));
        }
        StageOutcome::proceed()
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod host_tests;
