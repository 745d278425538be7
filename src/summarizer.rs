use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::data_models::{SummaryResult, truncate_chars};
use crate::error::{PipelineError, Result};

const ERROR_BODY_CHARS: usize = 500;
const FALLBACK_BODY_CHARS: usize = 1000;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> SummaryResult;
}

/// Linear backoff: the n-th retry waits `backoff * n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            backoff: Duration::from_secs_f64(1.0),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * (attempt + 1)
    }
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    inputs: &'a str,
    parameters: SummarizeParameters,
}

#[derive(Debug, Serialize)]
struct SummarizeParameters {
    min_length: u32,
    max_length: u32,
    do_sample: bool,
}

// Short, deterministic summaries.
const PARAMETERS: SummarizeParameters = SummarizeParameters {
    min_length: 30,
    max_length: 130,
    do_sample: false,
};

/// Client for a hosted Hugging Face summarization model.
pub struct HfSummarizer {
    client: reqwest::Client,
    api_token: Option<String>,
    endpoint: String,
    retry: RetryPolicy,
}

impl HfSummarizer {
    pub fn new(
        api_token: Option<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<HfSummarizer> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Http(format!("failed to build summarizer client: {e}")))?;
        Ok(HfSummarizer {
            client,
            api_token,
            endpoint: endpoint.into(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &Config) -> Result<HfSummarizer> {
        Self::new(
            config.hf_api_token.clone(),
            config.hf_api_url.clone(),
            config.summarize_timeout,
        )
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Summarizer for HfSummarizer {
    async fn summarize(&self, text: &str) -> SummaryResult {
        let Some(token) = self.api_token.as_deref() else {
            return SummaryResult::Error("not configured".to_string());
        };
        if text.trim().is_empty() {
            return SummaryResult::Empty;
        }

        let payload = SummarizeRequest {
            inputs: text,
            parameters: PARAMETERS,
        };

        let mut attempt = 0;
        loop {
            let sent = self
                .client
                .post(&self.endpoint)
                .bearer_auth(token)
                .json(&payload)
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    if attempt < self.retry.max_retries {
                        tracing::debug!(attempt, error = %e, "summarization request failed, retrying");
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return SummaryResult::Error(format!("request failed: {e}"));
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt < self.retry.max_retries {
                    tracing::debug!(attempt, "summarization rate limited, backing off");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                    continue;
                }
                return SummaryResult::Error("unavailable after retries".to_string());
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => return SummaryResult::Error(format!("request failed: {e}")),
            };

            if status.as_u16() >= 400 {
                return SummaryResult::Error(format!(
                    "status {}: {}",
                    status.as_u16(),
                    truncate_chars(&body, ERROR_BODY_CHARS)
                ));
            }

            return match serde_json::from_str::<Value>(&body) {
                Ok(data) => interpret_response(data),
                Err(e) => SummaryResult::Error(format!("invalid JSON in response: {e}")),
            };
        }
    }
}

/// Map a successful response body onto a summary.
///
/// Unknown but valid JSON is kept, stringified and cut to 1000 characters.
/// A null or blank summary counts as no summary at all.
pub fn interpret_response(data: Value) -> SummaryResult {
    if let Some(first) = data.as_array().and_then(|list| list.first()) {
        if let Some(summary) = first.get("summary_text") {
            return summary_from(summary);
        }
        if let Some(summary) = first.as_str() {
            return summary_from_str(summary);
        }
    }
    if let Some(map) = data.as_object() {
        if let Some(error) = map.get("error") {
            return SummaryResult::Error(value_to_string(error));
        }
        if let Some(summary) = map.get("summary_text") {
            return summary_from(summary);
        }
    }
    SummaryResult::Ok(truncate_chars(&data.to_string(), FALLBACK_BODY_CHARS).to_string())
}

fn summary_from(value: &Value) -> SummaryResult {
    match value {
        Value::Null => SummaryResult::Empty,
        other => summary_from_str(&value_to_string(other)),
    }
}

fn summary_from_str(summary: &str) -> SummaryResult {
    if summary.trim().is_empty() {
        SummaryResult::Empty
    } else {
        SummaryResult::Ok(summary.to_string())
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
