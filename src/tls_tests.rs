// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Unit tests for certificate naming and request construction.

#[cfg(test)]
mod tests {
    use crate::constants::{ANNOTATION_MANAGED_HOST, ANNOTATION_ORIGIN_CLUSTER, ANNOTATION_TRAFFIC_KEY, LABEL_MANAGED};
    use crate::crd::{Route, RouteSpec, RouteTargetReference};
    use crate::tls::{certificate_name, tls_secret_name, CertStatus, CertificateRequest};
    use crate::traffic::{TrafficResource, TrafficRoute};
    use std::collections::BTreeMap;

    fn route(annotations: &[(&str, &str)]) -> TrafficRoute {
        let mut inner = Route::new(
            "app",
            RouteSpec {
                host: None,
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
        inner.metadata.annotations = Some(
            annotations
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        );
        TrafficRoute::new(inner)
    }

    #[test]
    fn test_certificate_name_strips_colons() {
        assert_eq!(
            certificate_name("root:org:ws", "team-a", "app"),
            "rootorgws-team-a-app"
        );
    }

    #[test]
    fn test_certificate_name_without_cluster() {
        assert_eq!(certificate_name("", "team-a", "app"), "team-a-app");
    }

    #[test]
    fn test_tls_secret_name_is_prefixed() {
        assert_eq!(tls_secret_name("app"), "hcg-tls-app");
    }

    #[test]
    fn test_cert_status_annotation_values() {
        assert_eq!(CertStatus::Pending.as_str(), "pending");
        assert_eq!(CertStatus::Ready.as_str(), "ready");
    }

    #[test]
    fn test_request_for_resource_carries_host_and_key() {
        let route = route(&[
            (ANNOTATION_MANAGED_HOST, "abcd.glbc.example.com"),
            (ANNOTATION_ORIGIN_CLUSTER, "root:org:ws"),
        ]);
        let request = CertificateRequest::for_resource(&route);

        assert_eq!(request.name, "rootorgws-team-a-app");
        assert_eq!(request.host, "abcd.glbc.example.com");
        assert_eq!(request.labels.get(LABEL_MANAGED).map(String::as_str), Some("true"));
        assert_eq!(
            request.annotations.get(ANNOTATION_TRAFFIC_KEY).map(String::as_str),
            Some("team-a/app")
        );
    }

    #[test]
    fn test_request_without_managed_host_has_empty_host() {
        let route = route(&[]);
        let request = CertificateRequest::for_resource(&route);
        assert_eq!(request.name, "team-a-app");
        assert!(request.host.is_empty());
    }
}
