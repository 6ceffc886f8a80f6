// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Unit tests for the shared traffic resource capability set.

#[cfg(test)]
mod tests {
    use crate::constants::{
        ANNOTATION_MANAGED_HOST, CASCADE_CLEANUP_FINALIZER, WORKLOAD_DELETING_PREFIX,
        WORKLOAD_GEO_PREFIX, WORKLOAD_STATE_PREFIX, WORKLOAD_STATUS_PREFIX,
    };
    use crate::dns::TargetType;
    use crate::net::{HostAddress, HostResolver};
    use crate::traffic::{ObjectKey, TrafficIngress, TrafficResource};
    use async_trait::async_trait;
    use k8s_openapi::api::networking::v1::Ingress;
    use std::collections::{BTreeMap, HashMap};
    use std::net::IpAddr;

    struct StaticResolver {
        addresses: HashMap<String, Vec<IpAddr>>,
    }

    impl StaticResolver {
        fn new(entries: &[(&str, &[&str])]) -> Self {
            let addresses = entries
                .iter()
                .map(|(host, ips)| {
                    (
                        (*host).to_string(),
                        ips.iter().map(|ip| ip.parse().unwrap()).collect(),
                    )
                })
                .collect();
            StaticResolver { addresses }
        }
    }

    #[async_trait]
    impl HostResolver for StaticResolver {
        async fn lookup_ips(&self, host: &str) -> anyhow::Result<Vec<HostAddress>> {
            match self.addresses.get(host) {
                Some(ips) => Ok(ips
                    .iter()
                    .map(|ip| HostAddress {
                        host: host.to_string(),
                        ip: *ip,
                    })
                    .collect()),
                None => Err(anyhow::anyhow!("no such host: {host}")),
            }
        }
    }

    fn ingress(
        annotations: &[(&str, &str)],
        labels: &[(&str, &str)],
    ) -> TrafficIngress {
        let mut inner = Ingress::default();
        inner.metadata.name = Some("app".to_string());
        inner.metadata.namespace = Some("team-a".to_string());
        inner.metadata.annotations = Some(to_map(annotations));
        inner.metadata.labels = Some(to_map(labels));
        TrafficIngress::new(inner)
    }

    fn to_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_object_key_display() {
        let key = ObjectKey::new("team-a", "app");
        assert_eq!(key.to_string(), "team-a/app");
    }

    #[test]
    fn test_managed_host_reads_annotation() {
        let resource = ingress(&[(ANNOTATION_MANAGED_HOST, "abcd.glbc.example.com")], &[]);
        assert_eq!(resource.managed_host(), Some("abcd.glbc.example.com"));
    }

    #[test]
    fn test_finalizers_add_is_idempotent() {
        let mut resource = ingress(&[], &[]);
        resource.add_finalizer(CASCADE_CLEANUP_FINALIZER);
        resource.add_finalizer(CASCADE_CLEANUP_FINALIZER);
        assert_eq!(resource.finalizers().len(), 1);

        resource.remove_finalizer(CASCADE_CLEANUP_FINALIZER);
        assert!(resource.finalizers().is_empty());
    }

    #[test]
    fn test_sync_targets_only_counts_sync_state() {
        let resource = ingress(
            &[],
            &[
                (&format!("{WORKLOAD_STATE_PREFIX}cluster-1"), "Sync"),
                (&format!("{WORKLOAD_STATE_PREFIX}cluster-2"), "Upsync"),
                ("app", "demo"),
            ],
        );
        assert_eq!(resource.sync_targets(), vec!["cluster-1".to_string()]);
    }

    #[test]
    fn test_cluster_deleting_marker() {
        let resource = ingress(
            &[(&format!("{WORKLOAD_DELETING_PREFIX}cluster-1"), "2026-01-01")],
            &[],
        );
        assert!(resource.is_cluster_deleting("cluster-1"));
        assert!(!resource.is_cluster_deleting("cluster-2"));
    }

    #[test]
    fn test_cluster_geo_defaults_when_absent_or_malformed() {
        let resource = ingress(
            &[(&format!("{WORKLOAD_GEO_PREFIX}cluster-1"), "not json")],
            &[],
        );
        assert_eq!(resource.cluster_geo("cluster-1").continent_code, "");
        assert_eq!(resource.cluster_geo("cluster-2").continent_code, "");
    }

    #[test]
    fn test_owner_reference_points_back() {
        let mut resource = ingress(&[], &[]);
        resource.metadata_mut().uid = Some("uid-123".to_string());
        let owner = resource.owner_reference();
        assert_eq!(owner.kind, "Ingress");
        assert_eq!(owner.api_version, "networking.k8s.io/v1");
        assert_eq!(owner.name, "app");
        assert_eq!(owner.uid, "uid-123");
        assert_eq!(owner.controller, Some(true));
    }

    #[tokio::test]
    async fn test_targets_resolves_hostnames_per_cluster() {
        let status = r#"{"loadBalancer":{"ingress":[{"hostname":"lb.cluster-1.example.com"}]}}"#;
        let resource = ingress(
            &[(&format!("{WORKLOAD_STATUS_PREFIX}cluster-1"), status)],
            &[],
        );
        let resolver =
            StaticResolver::new(&[("lb.cluster-1.example.com", &["1.2.3.4", "5.6.7.8"])]);

        let targets = resource.targets(&resolver).await.unwrap();
        let cluster = targets.get("cluster-1").unwrap();
        let target = cluster.get("lb.cluster-1.example.com").unwrap();
        assert_eq!(target.target_type, TargetType::Host);
        assert_eq!(target.value, vec!["1.2.3.4".to_string(), "5.6.7.8".to_string()]);
    }

    #[tokio::test]
    async fn test_targets_keeps_bare_ips_unresolved() {
        let status = r#"{"loadBalancer":{"ingress":[{"ip":"9.9.9.9"}]}}"#;
        let resource = ingress(
            &[(&format!("{WORKLOAD_STATUS_PREFIX}cluster-1"), status)],
            &[],
        );
        let resolver = StaticResolver::new(&[]);

        let targets = resource.targets(&resolver).await.unwrap();
        let target = targets.get("cluster-1").unwrap().get("9.9.9.9").unwrap();
        assert_eq!(target.target_type, TargetType::Ip);
        assert_eq!(target.value, vec!["9.9.9.9".to_string()]);
    }

    #[tokio::test]
    async fn test_targets_skips_malformed_status() {
        let good = r#"{"loadBalancer":{"ingress":[{"ip":"9.9.9.9"}]}}"#;
        let resource = ingress(
            &[
                (&format!("{WORKLOAD_STATUS_PREFIX}cluster-1"), "not json"),
                (&format!("{WORKLOAD_STATUS_PREFIX}cluster-2"), good),
            ],
            &[],
        );
        let resolver = StaticResolver::new(&[]);

        let targets = resource.targets(&resolver).await.unwrap();
        assert!(!targets.contains_key("cluster-1"));
        assert!(targets.contains_key("cluster-2"));
    }

    #[tokio::test]
    async fn test_targets_propagates_resolution_failure() {
        let status = r#"{"loadBalancer":{"ingress":[{"hostname":"gone.example.com"}]}}"#;
        let resource = ingress(
            &[(&format!("{WORKLOAD_STATUS_PREFIX}cluster-1"), status)],
            &[],
        );
        let resolver = StaticResolver::new(&[]);

        assert!(resource.targets(&resolver).await.is_err());
    }

    #[tokio::test]
    async fn test_targets_attaches_cluster_geo() {
        let status = r#"{"loadBalancer":{"ingress":[{"ip":"9.9.9.9"}]}}"#;
        let resource = ingress(
            &[
                (&format!("{WORKLOAD_STATUS_PREFIX}cluster-1"), status),
                (
                    &format!("{WORKLOAD_GEO_PREFIX}cluster-1"),
                    r#"{"continent_code":"EU"}"#,
                ),
            ],
            &[],
        );
        let resolver = StaticResolver::new(&[]);

        let targets = resource.targets(&resolver).await.unwrap();
        let target = targets.get("cluster-1").unwrap().get("9.9.9.9").unwrap();
        assert_eq!(target.geo.continent_code, "EU");
    }
}
