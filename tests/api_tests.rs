use anyhow::Result;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use search_summary::api::create_router;
use search_summary::config::{Config, ErrorPolicy};
use search_summary::orchestrator::Orchestrator;

mod test_helpers {
    use super::*;

    /// A config pointing every upstream at the mock server.
    pub fn config_for(server: &MockServer) -> Config {
        Config {
            brave_api_key: Some("brave-key".into()),
            hf_api_token: Some("hf-token".into()),
            brave_api_url: format!("{}/res/v1/web/search", server.uri()),
            hf_api_url: format!("{}/models/summarizer", server.uri()),
            fetch_timeout: Duration::from_secs(5),
            ..Config::default()
        }
    }

    pub fn router(config: &Config) -> axum::Router {
        let orchestrator = Orchestrator::from_config(config).unwrap();
        create_router(Arc::new(orchestrator), &config.cors_origins)
    }

    pub async fn get(app: axum::Router, uri: &str) -> Result<(StatusCode, Value)> {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    pub async fn mount_search(server: &MockServer, body: Value, status: u16) {
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_health() -> Result<()> {
    let (status, body) = get(router(&Config::default()), "/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    Ok(())
}

#[tokio::test]
async fn test_missing_query_is_unprocessable() -> Result<()> {
    let server = MockServer::start().await;
    let (status, body) = get(router(&config_for(&server)), "/search_summary").await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("`q`"));
    Ok(())
}

#[tokio::test]
async fn test_missing_search_key_is_server_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config {
        brave_api_key: None,
        ..config_for(&server)
    };
    let (status, body) = get(router(&config), "/search_summary?q=rust").await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "BRAVE_API_KEY not configured");
    Ok(())
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() -> Result<()> {
    let server = MockServer::start().await;
    mount_search(&server, json!({"error": "quota"}), 429).await;

    let (status, body) = get(router(&config_for(&server)), "/search_summary?q=rust").await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["detail"].as_str().unwrap().contains("429"));
    Ok(())
}

#[tokio::test]
async fn test_upstream_failure_lenient_is_empty_result() -> Result<()> {
    let server = MockServer::start().await;
    mount_search(&server, json!({"error": "quota"}), 429).await;

    let config = Config {
        error_policy: ErrorPolicy::Lenient,
        ..config_for(&server)
    };
    let (status, body) = get(router(&config), "/search_summary?q=rust").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([]));
    assert!(body["combined_summary"].is_null());
    Ok(())
}

#[tokio::test]
async fn test_full_pipeline_over_http() -> Result<()> {
    let server = MockServer::start().await;
    let page_a = format!("{}/pages/a", server.uri());
    let page_b = format!("{}/pages/b", server.uri());
    mount_search(
        &server,
        json!({"web": {"results": [
            {"title": "A", "url": &page_a, "description": "first"},
            {"title": "B", "url": &page_b, "description": "second"},
        ]}}),
        200,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pages/a"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><article><p>Alpha page content.</p></article></body></html>",
            "text/html",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pages/b"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/summarizer"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"summary_text": "Alpha summary."}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(
        router(&config_for(&server)),
        "/search_summary?q=rust%20vs%20go&country=BE&ui_lang=fr-FR",
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "rust vs go");
    assert_eq!(body["country"], "BE");
    assert_eq!(body["ui_lang"], "fr-FR");
    assert_eq!(body["results"][0]["title"], "A");
    assert_eq!(body["results"][0]["content_preview"], "Alpha page content.");
    assert_eq!(body["results"][0]["summary"], "Alpha summary.");
    assert_eq!(body["results"][1]["url"], page_b);
    assert!(body["results"][1]["content_preview"].is_null());
    assert!(body["results"][1]["summary"].is_null());
    assert_eq!(body["combined_summary"], "Alpha summary.");
    Ok(())
}

#[tokio::test]
async fn test_cors_allows_configured_origin() -> Result<()> {
    let config = Config {
        cors_origins: vec!["https://frontend.example.com".into()],
        ..Config::default()
    };
    let response = router(&config)
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://frontend.example.com")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("https://frontend.example.com")
    );

    let response = router(&config)
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://evil.example.com")
                .body(Body::empty())?,
        )
        .await?;
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
    Ok(())
}
