use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::data_models::{MAX_RESULTS, SearchQuery, SearchResultItem, truncate_chars};
use crate::error::{PipelineError, Result};

const BODY_EXCERPT_CHARS: usize = 400;

/// A web search backend returning ranked results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Whether the credential needed for `search` is present.
    fn is_configured(&self) -> bool;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>>;
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

/// Client for the Brave web search API. Single attempt per call, no retries.
pub struct BraveSearchClient {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl BraveSearchClient {
    pub fn new(
        api_key: Option<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<BraveSearchClient> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Http(format!("failed to build search client: {e}")))?;
        Ok(BraveSearchClient {
            client,
            api_key,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<BraveSearchClient> {
        Self::new(
            config.brave_api_key.clone(),
            config.brave_api_url.clone(),
            config.search_timeout,
        )
    }
}

#[async_trait]
impl SearchProvider for BraveSearchClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>> {
        if query.text.trim().is_empty() {
            return Err(PipelineError::InvalidQuery("query cannot be empty".into()));
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PipelineError::Configuration("BRAVE_API_KEY not configured".into()))?;

        let count = MAX_RESULTS.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .query(&[
                ("q", query.text.as_str()),
                ("count", count.as_str()),
                ("country", query.country.as_str()),
                ("ui_lang", query.ui_lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "error calling search provider");
                PipelineError::UpstreamUnavailable(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        if !status.is_success() {
            let body_excerpt = truncate_chars(&body, BODY_EXCERPT_CHARS).to_string();
            tracing::error!(
                status = status.as_u16(),
                body = %body_excerpt,
                "search provider returned non-success status"
            );
            return Err(PipelineError::UpstreamRejected {
                status: status.as_u16(),
                body_excerpt,
            });
        }

        Ok(parse_results(status, &body))
    }
}

/// Pull the ranked result list out of a provider response body.
///
/// A missing or malformed list is not an error, just an empty answer.
fn parse_results(status: StatusCode, body: &str) -> Vec<SearchResultItem> {
    let parsed: BraveResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(status = status.as_u16(), error = %e, "unparseable search response");
            return Vec::new();
        }
    };

    parsed
        .web
        .map(|web| web.results)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<SearchResultItem>(raw) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed search result");
                None
            }
        })
        .take(MAX_RESULTS)
        .collect()
}

#[test]
fn test_parse_results_caps_and_keeps_order() {
    let results: Vec<serde_json::Value> = (0..10)
        .map(|i| {
            serde_json::json!({
                "title": format!("Result {i}"),
                "url": format!("https://example.com/{i}"),
                "description": "desc",
                "age": "2 days ago"
            })
        })
        .collect();
    let body = serde_json::json!({ "web": { "results": results } }).to_string();

    let items = parse_results(StatusCode::OK, &body);
    assert_eq!(items.len(), MAX_RESULTS);
    for (i, item) in items.iter().enumerate() {
        assert_eq!(item.url, format!("https://example.com/{i}"));
    }
}

#[test]
fn test_parse_results_missing_or_malformed() {
    assert!(parse_results(StatusCode::OK, "{}").is_empty());
    assert!(parse_results(StatusCode::OK, r#"{"web": {}}"#).is_empty());
    assert!(parse_results(StatusCode::OK, r#"{"web": {"results": "nope"}}"#).is_empty());
    assert!(parse_results(StatusCode::OK, "not json").is_empty());

    // entries without a url are dropped, the rest survive
    let body = r#"{"web": {"results": [{"title": "no url"}, {"url": "https://a.com"}]}}"#;
    let items = parse_results(StatusCode::OK, body);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].url, "https://a.com");
    assert_eq!(items[0].title, None);
}
