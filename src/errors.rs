// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Error types for certificate and workload-status operations.
//!
//! The certificate error taxonomy mirrors how the reconciliation pipeline
//! reacts to each failure:
//! - `AlreadyExists` routes the certificate stage onto the ready/pending
//!   fetch path and is never fatal.
//! - `NotReady` records a pending status annotation and lets the pipeline
//!   continue; a later watch event retries.
//! - `NotFound` on deletion is treated as success.
//! - Everything else stops the current pass and is surfaced to the queue
//!   for backoff retry.

use thiserror::Error;

/// Errors returned by a [`crate::tls::CertProvider`] implementation.
#[derive(Error, Debug)]
pub enum CertError {
    /// A certificate with this name already exists.
    ///
    /// Expected race on every pass after the first; the caller switches to
    /// fetching the issued secret instead.
    #[error("certificate '{name}' already exists")]
    AlreadyExists {
        /// The certificate name that already exists
        name: String,
    },

    /// The certificate (or its secret) does not exist.
    #[error("certificate '{name}' not found")]
    NotFound {
        /// The certificate name that was not found
        name: String,
    },

    /// The certificate exists but issuance has not completed, so no secret
    /// is available yet.
    #[error("certificate '{name}' is not ready yet")]
    NotReady {
        /// The certificate name still being issued
        name: String,
    },

    /// Transport or API failure talking to the certificate backend.
    #[error("certificate backend error for '{name}': {source}")]
    Backend {
        /// The certificate name the operation was for
        name: String,
        /// The underlying failure
        #[source]
        source: anyhow::Error,
    },
}

impl CertError {
    /// True when the error is the expected already-exists creation race.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, CertError::AlreadyExists { .. })
    }

    /// True when the dependent object simply does not exist (yet).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CertError::NotFound { .. })
    }

    /// True when issuance is still in flight.
    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, CertError::NotReady { .. })
    }
}

/// Errors raised while decoding per-cluster workload status annotations.
///
/// A malformed annotation only skips that cluster's contribution; it never
/// fails the whole resource.
#[derive(Error, Debug)]
pub enum StatusError {
    /// The status annotation value was not valid JSON for the expected
    /// payload shape.
    #[error("malformed sync status for cluster '{cluster}': {source}")]
    MalformedStatus {
        /// The workload cluster whose annotation failed to decode
        cluster: String,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A reported load balancer hostname failed to resolve.
    #[error("failed to resolve load balancer host '{host}': {source}")]
    HostResolution {
        /// The hostname that failed to resolve
        host: String,
        /// The underlying resolver failure
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
