// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Unit tests for the Route traffic adapter.

#[cfg(test)]
mod tests {
    use crate::constants::{WORKLOAD_DIFF_PREFIX, WORKLOAD_STATE_PREFIX};
    use crate::crd::{Route, RouteSpec, RouteTargetReference, TLSTermination};
    use crate::traffic::{TrafficResource, TrafficRoute};
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    const MANAGED: &str = "abcd.glbc.example.com";

    fn route_with_host(host: Option<&str>) -> TrafficRoute {
        let mut inner = Route::new(
            "app",
            RouteSpec {
                host: host.map(str::to_string),
                path: None,
                to: RouteTargetReference {
                    kind: "Service".to_string(),
                    name: "app".to_string(),
                    weight: None,
                },
                tls: None,
            },
        );
        inner.metadata.namespace = Some("team-a".to_string());
        TrafficRoute::new(inner)
    }

    #[test]
    fn test_replace_hosts_swaps_custom_host() {
        let mut resource = route_with_host(Some("app.example.com"));
        let replaced = resource.replace_hosts(MANAGED);
        assert_eq!(replaced, vec!["app.example.com".to_string()]);
        assert_eq!(resource.hosts(), vec![MANAGED.to_string()]);
    }

    #[test]
    fn test_replace_hosts_fills_missing_host() {
        let mut resource = route_with_host(None);
        assert!(resource.replace_hosts(MANAGED).is_empty());
        assert_eq!(resource.hosts(), vec![MANAGED.to_string()]);
    }

    #[test]
    fn test_replace_hosts_is_idempotent() {
        let mut resource = route_with_host(Some(MANAGED));
        assert!(resource.replace_hosts(MANAGED).is_empty());
    }

    #[test]
    fn test_apply_tls_secret_builds_edge_termination() {
        let mut resource = route_with_host(Some(MANAGED));
        let mut data = BTreeMap::new();
        data.insert("tls.key".to_string(), ByteString(b"KEY".to_vec()));
        data.insert("tls.crt".to_string(), ByteString(b"CERT".to_vec()));
        data.insert("ca.crt".to_string(), ByteString(b"CA".to_vec()));
        let secret = Secret {
            data: Some(data),
            ..Secret::default()
        };

        resource.apply_tls_secret(&secret, "hcg-tls-app");

        let tls = resource.inner().spec.tls.as_ref().unwrap();
        assert_eq!(tls.termination, TLSTermination::Edge);
        assert_eq!(tls.key.as_deref(), Some("KEY"));
        assert_eq!(tls.certificate.as_deref(), Some("CERT"));
        assert_eq!(tls.ca_certificate.as_deref(), Some("CA"));
    }

    #[test]
    fn test_decode_sync_status_maps_router_hostname() {
        let resource = route_with_host(None);
        let points = resource
            .decode_sync_status(
                "cluster-1",
                r#"{"ingress":[{"routerCanonicalHostname":"router.cluster-1.example.com"}]}"#,
            )
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(
            points[0].hostname.as_deref(),
            Some("router.cluster-1.example.com")
        );
        assert!(points[0].ip.is_none());
    }

    #[test]
    fn test_decode_sync_status_rejects_garbage() {
        let resource = route_with_host(None);
        assert!(resource.decode_sync_status("cluster-1", "{]").is_err());
    }

    #[test]
    fn test_apply_transforms_restores_spec_and_records_diff() {
        let original = route_with_host(Some("app.example.com"));
        let mut reconciled = original.clone();
        reconciled
            .metadata_mut()
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(format!("{WORKLOAD_STATE_PREFIX}cluster-1"), "Sync".to_string());
        reconciled.replace_hosts(MANAGED);

        reconciled.apply_transforms(&original).unwrap();

        assert_eq!(reconciled.hosts(), vec!["app.example.com".to_string()]);
        let diff = reconciled
            .annotation(&format!("{WORKLOAD_DIFF_PREFIX}cluster-1"))
            .unwrap();
        let patches: serde_json::Value = serde_json::from_str(diff).unwrap();
        assert_eq!(patches[0]["path"], "/host");
        assert_eq!(patches[0]["value"], MANAGED);
    }
}
