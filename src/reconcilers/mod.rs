// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! The reconciliation pipeline for traffic resources.
//!
//! Every reconciliation of an Ingress or Route runs the same fixed stage
//! sequence:
//!
//! 1. [`host::HostStage`] - assign the managed host and rewrite user hosts
//! 2. [`certificate::CertificateStage`] - drive the TLS certificate lifecycle
//! 3. [`dns::DnsStage`] - extract targets and synthesize the DNSRecord
//!
//! A stage returns a [`StageOutcome`]: whether the remaining stages should
//! run this pass, plus an optional error. The two are independent - a stage
//! can fail and still let the pipeline continue (certificate still pending),
//! or succeed and stop it (managed host freshly assigned, persist first).
//! All stage errors are aggregated; a later stage's success never hides an
//! earlier stage's failure.
//!
//! The pipeline itself only mutates the in-memory resource. Persistence is
//! the caller's job: compare the reconciled copy against the original and
//! submit one update on the observed resource version, treating a conflict
//! as an ordinary retry.

use crate::constants::{CASCADE_CLEANUP_FINALIZER, SYNCER_FINALIZER_PREFIX};
use crate::traffic::TrafficResource;
use anyhow::anyhow;
use async_trait::async_trait;
use tracing::{debug, warn};

pub mod certificate;
pub mod dns;
pub mod host;

pub use certificate::CertificateStage;
pub use dns::DnsStage;
pub use host::HostStage;

/// Whether the remaining stages of the current pass should run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// Run the next stage.
    Continue,
    /// Skip the remaining stages; the pass ends after persistence.
    Stop,
}

/// The result of one stage: a flow decision and an optional error.
#[derive(Debug)]
pub struct StageOutcome {
    /// Whether the pipeline keeps running after this stage.
    pub status: ReconcileStatus,
    /// A failure to surface once the pass completes.
    pub error: Option<anyhow::Error>,
}

impl StageOutcome {
    /// Success; run the next stage.
    #[must_use]
    pub fn proceed() -> Self {
        StageOutcome {
            status: ReconcileStatus::Continue,
            error: None,
        }
    }

    /// Success; skip the remaining stages this pass.
    #[must_use]
    pub fn halt() -> Self {
        StageOutcome {
            status: ReconcileStatus::Stop,
            error: None,
        }
    }

    /// Record `error` but keep the pipeline running.
    #[must_use]
    pub fn proceed_with(error: anyhow::Error) -> Self {
        StageOutcome {
            status: ReconcileStatus::Continue,
            error: Some(error),
        }
    }

    /// Record `error` and skip the remaining stages this pass.
    #[must_use]
    pub fn halt_with(error: anyhow::Error) -> Self {
        StageOutcome {
            status: ReconcileStatus::Stop,
            error: Some(error),
        }
    }
}

/// One step of the reconciliation pipeline.
#[async_trait]
pub trait TrafficStage<T: TrafficResource>: Send + Sync {
    /// Stage name, for logs and error aggregation.
    fn name(&self) -> &'static str;

    /// Run the stage against the in-memory resource.
    async fn reconcile(&self, resource: &mut T) -> StageOutcome;
}

/// The ordered stage sequence for one traffic kind.
pub struct Pipeline<T: TrafficResource> {
    stages: Vec<Box<dyn TrafficStage<T>>>,
}

impl<T: TrafficResource> Pipeline<T> {
    #[must_use]
    pub fn new(stages: Vec<Box<dyn TrafficStage<T>>>) -> Self {
        Pipeline { stages }
    }

    /// Run the pipeline over `resource`, mutating it in place.
    ///
    /// A live resource gains the cascade-cleanup finalizer before any stage
    /// runs. A delete-marked resource that completes the pass without errors
    /// sheds that finalizer along with any stale syncer finalizers, letting
    /// the API server garbage-collect it.
    pub async fn run(&self, resource: &mut T) -> anyhow::Result<()> {
        if !resource.is_deleted() {
            resource.add_finalizer(CASCADE_CLEANUP_FINALIZER);
        }

        let mut failures: Vec<(&'static str, anyhow::Error)> = Vec::new();
        for stage in &self.stages {
            let outcome = stage.reconcile(resource).await;
            if let Some(error) = outcome.error {
                warn!(kind = resource.kind(), resource = %resource.key(),
                    stage = stage.name(), error = %error, "stage failed");
                failures.push((stage.name(), error));
            }
            if outcome.status == ReconcileStatus::Stop {
                debug!(kind = resource.kind(), resource = %resource.key(),
                    stage = stage.name(), "stage stopped the pass");
                break;
            }
        }

        if failures.is_empty() && resource.is_deleted() {
            resource.remove_finalizer(CASCADE_CLEANUP_FINALIZER);
            for finalizer in resource.finalizers() {
                if finalizer.starts_with(SYNCER_FINALIZER_PREFIX) {
                    debug!(resource = %resource.key(), finalizer = %finalizer,
                        "removing stale syncer finalizer");
                    resource.remove_finalizer(&finalizer);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            let detail = failures
                .iter()
                .map(|(stage, error)| format!("{stage}: {error:#}"))
                .collect::<Vec<_>>()
                .join("; ");
            Err(anyhow!("reconciliation failed [{detail}]"))
        }
    }
}
