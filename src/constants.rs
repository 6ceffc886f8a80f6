// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Global constants for the glbc controller.
//!
//! This module contains the annotation keys, label prefixes and numeric
//! constants used throughout the codebase, organized by category.

// ============================================================================
// API Constants
// ============================================================================

/// API group for glbc CRDs
pub const API_GROUP: &str = "glbc.dev";

/// API version for glbc CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "glbc.dev/v1alpha1";

/// Kind name for the `DNSRecord` resource
pub const KIND_DNS_RECORD: &str = "DNSRecord";

/// Kind name for the `Route` resource
pub const KIND_ROUTE: &str = "Route";

// ============================================================================
// Annotation and Label Keys
// ============================================================================

/// Annotation holding the generated managed host for a traffic resource.
/// Once set it is never changed for the life of the resource.
pub const ANNOTATION_MANAGED_HOST: &str = "glbc.dev/host.generated";

/// Annotation recording user-declared hosts that were replaced by the
/// managed host in the resource's routing rules.
pub const ANNOTATION_CUSTOM_HOST_REPLACED: &str = "glbc.dev/custom-hosts.replaced";

/// Annotation recording the last observed certificate state (pending/ready).
pub const ANNOTATION_CERTIFICATE_STATE: &str = "glbc.dev/certificate-status";

/// Annotation placed on owned objects (DNSRecord, Certificate) pointing back
/// at the owning traffic resource's namespace/name key.
pub const ANNOTATION_TRAFFIC_KEY: &str = "glbc.dev/traffic-key";

/// Prefix for health-check annotations copied verbatim onto the DNSRecord.
pub const ANNOTATION_HEALTH_CHECK_PREFIX: &str = "health.glbc.dev/";

/// Annotation naming the cluster a traffic resource originates from; feeds
/// into the deterministic certificate name.
pub const ANNOTATION_ORIGIN_CLUSTER: &str = "glbc.dev/origin-cluster";

/// Label marking objects created and managed by this controller.
pub const LABEL_MANAGED: &str = "glbc.dev/managed";

// ============================================================================
// Workload Cluster Annotations
// ============================================================================

/// Prefix for the per-cluster sync status annotation. The full key is
/// `status.workload.glbc.dev/<clusterID>` and the value is the JSON-encoded
/// sync status published by that workload cluster.
pub const WORKLOAD_STATUS_PREFIX: &str = "status.workload.glbc.dev/";

/// Prefix for the per-cluster deletion marker annotation. Presence of
/// `deletion.workload.glbc.dev/<clusterID>` (any value) marks the cluster as
/// draining out of the deployment.
pub const WORKLOAD_DELETING_PREFIX: &str = "deletion.workload.glbc.dev/";

/// Prefix for the per-cluster geo metadata annotation
/// (`geo.workload.glbc.dev/<clusterID>`, JSON-encoded [`crate::dns::GeoMeta`](crate::dns::GeoMeta)).
pub const WORKLOAD_GEO_PREFIX: &str = "geo.workload.glbc.dev/";

/// Prefix for the per-cluster spec-diff annotation written by transforms
/// (`diff.workload.glbc.dev/<clusterID>`, JSON patch array).
pub const WORKLOAD_DIFF_PREFIX: &str = "diff.workload.glbc.dev/";

/// Prefix for the sync-state label identifying scheduled workload clusters
/// (`state.workload.glbc.dev/<clusterID>` = `Sync`).
pub const WORKLOAD_STATE_PREFIX: &str = "state.workload.glbc.dev/";

/// Prefix of finalizers placed by the workload syncer; stale entries are
/// removed once a deleted resource has been fully cleaned up.
pub const SYNCER_FINALIZER_PREFIX: &str = "workload.glbc.dev/syncer-";

/// Finalizer guaranteeing certificate and DNS cleanup runs before the
/// traffic resource itself is garbage collected.
pub const CASCADE_CLEANUP_FINALIZER: &str = "glbc.dev/cascade-cleanup";

// ============================================================================
// TLS Constants
// ============================================================================

/// Name prefix of the TLS secret copied into the resource namespace; the
/// full name is `hcg-tls-<resource-name>`.
pub const TLS_SECRET_NAME_PREFIX: &str = "hcg-tls-";

/// Secret data key for the CA certificate.
pub const TLS_DATA_CA_CERT: &str = "ca.crt";

/// Secret data key for the server certificate.
pub const TLS_DATA_CERT: &str = "tls.crt";

/// Secret data key for the private key.
pub const TLS_DATA_KEY: &str = "tls.key";

// ============================================================================
// DNS Constants
// ============================================================================

/// TTL applied to every synthesized endpoint (seconds).
pub const DEFAULT_ENDPOINT_TTL_SECS: i64 = 60;

/// Provider-specific key carrying the weight of an A endpoint.
pub const PROVIDER_SPECIFIC_WEIGHT: &str = "aws/weight";

/// Provider-specific key carrying the geolocation continent code.
pub const PROVIDER_SPECIFIC_GEO_CONTINENT: &str = "aws/geolocation-continent-code";

/// Provider-specific key carrying the geolocation country code.
pub const PROVIDER_SPECIFIC_GEO_COUNTRY: &str = "aws/geolocation-country-code";

/// Upper bound for the per-endpoint weight allowance. Weights are computed
/// as `MAX_ENDPOINT_WEIGHT / n` with `n` clamped to this value, so every
/// weight lands in `1..=MAX_ENDPOINT_WEIGHT`.
pub const MAX_ENDPOINT_WEIGHT: usize = 120;

/// Continent code used when geo lookup fails in every tier.
pub const DEFAULT_CONTINENT_CODE: &str = "NA";

// ============================================================================
// Host Watcher Constants
// ============================================================================

/// Default interval between host re-resolutions (seconds).
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 60;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration for settled resources (5 minutes)
pub const STEADY_REQUEUE_DURATION_SECS: u64 = 300;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the Prometheus metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for the Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";
