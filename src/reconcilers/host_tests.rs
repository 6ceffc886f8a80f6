// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Unit tests for managed host assignment.

#[cfg(test)]
mod tests {
    use crate::constants::{ANNOTATION_CUSTOM_HOST_REPLACED, ANNOTATION_MANAGED_HOST};
    use crate::reconcilers::{HostStage, ReconcileStatus, TrafficStage};
    use crate::traffic::{TrafficIngress, TrafficResource};
    use k8s_openapi::api::networking::v1::{Ingress, IngressRule, IngressSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    const DOMAIN: &str = "glbc.example.com";

    fn ingress(host: Option<&str>) -> TrafficIngress {
        let mut inner = Ingress::default();
        inner.metadata.name = Some("app".to_string());
        inner.metadata.namespace = Some("team-a".to_string());
        inner.spec = Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: host.map(str::to_string),
                http: None,
            }]),
            ..IngressSpec::default()
        });
        TrafficIngress::new(inner)
    }

    #[tokio::test]
    async fn test_first_pass_assigns_and_stops() {
        let stage = HostStage::new(DOMAIN);
        let mut resource = ingress(Some("app.example.com"));

        let outcome = stage.reconcile(&mut resource).await;
        assert_eq!(outcome.status, ReconcileStatus::Stop);
        assert!(outcome.error.is_none());

        let host = resource.managed_host().unwrap();
        assert!(host.ends_with(&format!(".{DOMAIN}")));
        let id = host.strip_suffix(&format!(".{DOMAIN}")).unwrap();
        assert!(!id.is_empty());
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));

        // The user host is untouched until the annotation is persisted.
        assert_eq!(resource.hosts(), vec!["app.example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_assigned_host_is_never_regenerated() {
        let stage = HostStage::new(DOMAIN);
        let mut resource = ingress(Some("app.example.com"));

        stage.reconcile(&mut resource).await;
        let assigned = resource.managed_host().unwrap().to_string();

        for _ in 0..3 {
            let outcome = stage.reconcile(&mut resource).await;
            assert_eq!(outcome.status, ReconcileStatus::Continue);
            assert_eq!(resource.managed_host(), Some(assigned.as_str()));
        }
    }

    #[tokio::test]
    async fn test_second_pass_rewrites_user_hosts() {
        let stage = HostStage::new(DOMAIN);
        let mut resource = ingress(Some("app.example.com"));

        stage.reconcile(&mut resource).await;
        let assigned = resource.managed_host().unwrap().to_string();
        stage.reconcile(&mut resource).await;

        assert_eq!(resource.hosts(), vec![assigned]);
        assert_eq!(
            resource.annotation(ANNOTATION_CUSTOM_HOST_REPLACED),
            Some("app.example.com")
        );
    }

    #[tokio::test]
    async fn test_no_replacement_annotation_without_custom_hosts() {
        let stage = HostStage::new(DOMAIN);
        let mut resource = ingress(None);

        stage.reconcile(&mut resource).await;
        stage.reconcile(&mut resource).await;

        assert!(!resource.has_annotation(ANNOTATION_CUSTOM_HOST_REPLACED));
    }

    #[tokio::test]
    async fn test_deleted_resource_is_untouched() {
        let stage = HostStage::new(DOMAIN);
        let mut resource = ingress(Some("app.example.com"));
        resource.metadata_mut().deletion_timestamp = Some(Time(k8s_openapi::jiff::Timestamp::now()));

        let outcome = stage.reconcile(&mut resource).await;
        assert_eq!(outcome.status, ReconcileStatus::Continue);
        assert!(!resource.has_annotation(ANNOTATION_MANAGED_HOST));
    }
}
