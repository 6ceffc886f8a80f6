// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Unit tests for the geo-IP resolver.

#[cfg(test)]
mod tests {
    use crate::geo::GeoResolver;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_remote_lookup_returns_continent_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.2.3.4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "continent": "Europe",
                "continent_code": "EU",
                "country": "Ireland",
                "country_code": "IE"
            })))
            .mount(&server)
            .await;

        let resolver = GeoResolver::new(server.uri(), None);
        assert_eq!(resolver.continent_code("1.2.3.4").await, "EU");
    }

    #[tokio::test]
    async fn test_unsuccessful_lookup_falls_back_to_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/10.0.0.1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": false})),
            )
            .mount(&server)
            .await;

        let resolver = GeoResolver::new(server.uri(), None);
        assert_eq!(resolver.continent_code("10.0.0.1").await, "NA");
    }

    #[tokio::test]
    async fn test_unparseable_response_falls_back_to_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.2.3.4"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let resolver = GeoResolver::new(server.uri(), None);
        assert_eq!(resolver.continent_code("1.2.3.4").await, "NA");
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back_to_default() {
        let resolver = GeoResolver::new("http://127.0.0.1:1", None);
        assert_eq!(resolver.continent_code("1.2.3.4").await, "NA");
    }

    #[tokio::test]
    async fn test_static_dataset_wins_over_remote() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("9.9.9.9.json"),
            r#"{"success": true, "continent_code": "SA"}"#,
        )
        .await
        .unwrap();

        // The remote service would answer EU; the dataset answer wins.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/9.9.9.9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "continent_code": "EU"
            })))
            .mount(&server)
            .await;

        let resolver = GeoResolver::new(server.uri(), Some(dir.path().to_path_buf()));
        assert_eq!(resolver.continent_code("9.9.9.9").await, "SA");
    }

    #[tokio::test]
    async fn test_missing_dataset_entry_uses_remote() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/8.8.8.8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "continent_code": "OC"
            })))
            .mount(&server)
            .await;

        let resolver = GeoResolver::new(server.uri(), Some(dir.path().to_path_buf()));
        assert_eq!(resolver.continent_code("8.8.8.8").await, "OC");
    }
}
