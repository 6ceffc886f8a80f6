// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! # glbc - Global Load Balancer Controller
//!
//! glbc is a Kubernetes controller that turns multi-cluster traffic
//! resources (Ingress and Route) into globally load-balanced deployments.
//! For each resource it:
//!
//! - assigns a stable generated hostname under a managed domain
//! - drives a TLS certificate for that hostname and copies the issued
//!   secret into the resource's namespace
//! - synthesizes a geo-partitioned, weighted `DNSRecord` from the targets
//!   each workload cluster publishes through status annotations
//! - re-resolves load balancer hostnames in the background and re-enqueues
//!   the owning resource when their address set changes
//!
//! ## Modules
//!
//! - [`crd`] - the `DNSRecord` and `Route` Custom Resource Definitions
//! - [`traffic`] - the polymorphic traffic resource capability set
//! - [`reconcilers`] - the host / certificate / DNS pipeline stages
//! - [`tls`] - the certificate backend capability (cert-manager)
//! - [`dns`] - DNS target model and provider capability
//! - [`net`] - hostname resolution and the host change watcher
//! - [`geo`] - geo-IP continent lookup with static-dataset fallback
//! - [`context`] - shared controller context and pipeline wiring
//! - [`config`] - flag and environment configuration
//! - [`metrics`] - Prometheus metrics and the metrics HTTP server
//!
//! ## Example
//!
//! ```rust
//! use glbc::reconcilers::dns::endpoint_weight;
//!
//! // Three backends sharing a continent split a fixed allowance.
//! assert_eq!(endpoint_weight(3), "40");
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod dns;
pub mod errors;
pub mod geo;
pub mod metrics;
pub mod net;
pub mod reconcilers;
pub mod tls;
pub mod traffic;
