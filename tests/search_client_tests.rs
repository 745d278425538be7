use anyhow::Result;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use search_summary::data_models::SearchQuery;
use search_summary::error::PipelineError;
use search_summary::search_client::{BraveSearchClient, SearchProvider};

mod test_helpers {
    use super::*;

    pub const SEARCH_PATH: &str = "/res/v1/web/search";

    pub fn client_for(server: &MockServer) -> BraveSearchClient {
        BraveSearchClient::new(
            Some("brave-key".to_string()),
            format!("{}{}", server.uri(), SEARCH_PATH),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    pub fn brave_body(count: usize) -> serde_json::Value {
        let results: Vec<_> = (0..count)
            .map(|i| {
                json!({
                    "title": format!("Result {i}"),
                    "url": format!("https://site{i}.example.com/"),
                    "description": format!("About result {i}"),
                })
            })
            .collect();
        json!({ "type": "search", "web": { "type": "search", "results": results } })
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_search_sends_params_and_token() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(header("x-subscription-token", "brave-key"))
        .and(header("accept", "application/json"))
        .and(query_param("q", "rust vs go"))
        .and(query_param("count", "7"))
        .and(query_param("country", "BE"))
        .and(query_param("ui_lang", "fr-FR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(brave_body(3)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let query = SearchQuery::new("rust vs go").with_locale("BE", "fr-FR");
    let items = client.search(&query).await?;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].title.as_deref(), Some("Result 0"));
    assert_eq!(items[2].url, "https://site2.example.com/");
    assert_eq!(items[1].description.as_deref(), Some("About result 1"));
    Ok(())
}

#[tokio::test]
async fn test_search_caps_results() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(brave_body(12)))
        .mount(&server)
        .await;

    let items = client_for(&server).search(&SearchQuery::new("many")).await?;
    assert_eq!(items.len(), 7);
    assert_eq!(items[6].url, "https://site6.example.com/");
    Ok(())
}

#[tokio::test]
async fn test_search_missing_results_is_empty() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "search"})))
        .mount(&server)
        .await;

    let items = client_for(&server).search(&SearchQuery::new("nothing")).await?;
    assert!(items.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_search_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid subscription token"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search(&SearchQuery::new("rust"))
        .await
        .unwrap_err();
    match err {
        PipelineError::UpstreamRejected {
            status,
            body_excerpt,
        } => {
            assert_eq!(status, 401);
            assert_eq!(body_excerpt, "invalid subscription token");
        }
        other => panic!("expected UpstreamRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_search_transport_failure() {
    let client = BraveSearchClient::new(
        Some("brave-key".to_string()),
        "http://127.0.0.1:9/res/v1/web/search",
        Duration::from_secs(2),
    )
    .unwrap();

    let err = client.search(&SearchQuery::new("rust")).await.unwrap_err();
    assert!(matches!(err, PipelineError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn test_search_rejects_blank_query_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(brave_body(1)))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search(&SearchQuery::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidQuery(_)));
}

#[tokio::test]
async fn test_search_without_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(brave_body(1)))
        .expect(0)
        .mount(&server)
        .await;

    let client = BraveSearchClient::new(
        None,
        format!("{}{}", server.uri(), SEARCH_PATH),
        Duration::from_secs(5),
    )
    .unwrap();
    assert!(!client.is_configured());

    let err = client.search(&SearchQuery::new("rust")).await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
}
