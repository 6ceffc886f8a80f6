// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Unit tests for the DNS target model.

#[cfg(test)]
mod tests {
    use crate::crd::{DNSRecord, DNSRecordSpec, DNSZone};
    use crate::dns::{FakeProvider, GeoMeta, Provider, Target, TargetType};

    #[test]
    fn test_host_target_keeps_all_addresses() {
        let target = Target::host(
            vec!["1.2.3.4".to_string(), "5.6.7.8".to_string()],
            GeoMeta::default(),
        );
        assert_eq!(target.target_type, TargetType::Host);
        assert_eq!(target.value.len(), 2);
    }

    #[test]
    fn test_ip_target_is_single_valued() {
        let target = Target::ip("1.2.3.4".to_string(), GeoMeta::default());
        assert_eq!(target.target_type, TargetType::Ip);
        assert_eq!(target.value, vec!["1.2.3.4".to_string()]);
    }

    #[test]
    fn test_geo_meta_decodes_partial_payload() {
        let geo: GeoMeta = serde_json::from_str(r#"{"continent_code":"EU"}"#).unwrap();
        assert_eq!(geo.continent_code, "EU");
        assert_eq!(geo.country_code, "");
        assert_eq!(geo.city, "");
    }

    #[tokio::test]
    async fn test_fake_provider_accepts_everything() {
        let provider = FakeProvider;
        let record = DNSRecord::new("app", DNSRecordSpec::default());
        let zone = DNSZone {
            id: "Z123".to_string(),
            domain_filter: None,
        };
        assert!(provider.ensure(&record, &zone).await.is_ok());
        assert!(provider.delete(&record, &zone).await.is_ok());
        assert!(provider.reconcile_health_checks(&record).await.is_ok());
    }
}
