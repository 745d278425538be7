use anyhow::Context;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::config::{Config, ErrorPolicy};
use crate::data_models::{
    AggregateResult, CONTENT_PREVIEW_CHARS, MAX_RESULTS, PageOutcome, ResultEntry, SearchQuery,
    SearchResultItem, SummaryResult, truncate_chars,
};
use crate::error::{PipelineError, Result};
use crate::extractor::{HttpPageExtractor, PageExtractor};
use crate::search_client::{BraveSearchClient, SearchProvider};
use crate::summarizer::{HfSummarizer, Summarizer};

/// Runs a query through search, page extraction and summarization.
pub struct Orchestrator {
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn PageExtractor>,
    summarizer: Arc<dyn Summarizer>,
    error_policy: ErrorPolicy,
    concurrency: usize,
    item_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn PageExtractor>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Orchestrator {
        Orchestrator {
            search,
            extractor,
            summarizer,
            error_policy: ErrorPolicy::Strict,
            concurrency: MAX_RESULTS,
            item_timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Orchestrator> {
        let search = BraveSearchClient::from_config(config)?;
        let extractor = HttpPageExtractor::new(config.fetch_timeout)
            .context("failed to create page extractor")?;
        let summarizer = HfSummarizer::from_config(config)?;

        Ok(Orchestrator::new(
            Arc::new(search),
            Arc::new(extractor),
            Arc::new(summarizer),
        )
        .with_error_policy(config.error_policy)
        .with_item_timeout(config.item_timeout))
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    pub fn with_item_timeout(mut self, item_timeout: Duration) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self, query: &SearchQuery) -> Result<AggregateResult> {
        let start = Instant::now();

        if !self.search.is_configured() {
            return Err(PipelineError::Configuration(
                "BRAVE_API_KEY not configured".into(),
            ));
        }

        let mut items = match self.search.search(query).await {
            Ok(items) => items,
            Err(e) if e.is_upstream() && self.error_policy == ErrorPolicy::Lenient => {
                tracing::warn!(
                    query = %query.text,
                    error = %e,
                    "search failed, returning empty result"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        items.truncate(MAX_RESULTS);

        let outcomes = self.process_items(&items).await;
        let results: Vec<ResultEntry> = items
            .into_iter()
            .zip(outcomes)
            .map(|(item, outcome)| ResultEntry { item, outcome })
            .collect();

        let aggregate = AggregateResult::new(query, results);
        tracing::info!(
            query = %query.text,
            results = aggregate.results.len(),
            summarized = aggregate
                .results
                .iter()
                .filter(|r| r.outcome.summary_text().is_some())
                .count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search summary finished"
        );
        Ok(aggregate)
    }

    /// Process every item concurrently; outcome `i` always belongs to item `i`.
    async fn process_items(&self, items: &[SearchResultItem]) -> Vec<PageOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = items
            .iter()
            .map(|item| {
                let url = item.url.clone();
                let extractor = self.extractor.clone();
                let summarizer = self.summarizer.clone();
                let semaphore = semaphore.clone();
                let item_timeout = self.item_timeout;
                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return PageOutcome::no_content();
                    };
                    process_item(extractor.as_ref(), summarizer.as_ref(), &url, item_timeout).await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(items)
            .map(|(joined, item)| {
                joined.unwrap_or_else(|e| {
                    tracing::error!(url = %item.url, error = %e, "result task failed");
                    PageOutcome::no_content()
                })
            })
            .collect()
    }
}

/// Extract and summarize one page, all within `item_timeout`.
///
/// Running out of time during summarization keeps the extracted preview and
/// records the timeout as the summary error.
async fn process_item(
    extractor: &dyn PageExtractor,
    summarizer: &dyn Summarizer,
    url: &str,
    item_timeout: Duration,
) -> PageOutcome {
    let deadline = tokio::time::Instant::now() + item_timeout;
    let timeout_ms = item_timeout.as_millis() as u64;

    let extracted = match tokio::time::timeout_at(deadline, extractor.extract(url)).await {
        Ok(extracted) => extracted,
        Err(_) => {
            tracing::warn!(url, timeout_ms, "page extraction timed out");
            return PageOutcome::no_content();
        }
    };
    let Some(content) = extracted else {
        return PageOutcome::no_content();
    };
    if content.trim().is_empty() {
        return PageOutcome::no_content();
    }
    let content = truncate_chars(&content, CONTENT_PREVIEW_CHARS).to_string();

    let summary = match tokio::time::timeout_at(deadline, summarizer.summarize(&content)).await {
        Ok(summary) => summary,
        Err(_) => SummaryResult::Error(format!("timed out after {timeout_ms} ms")),
    };
    match &summary {
        SummaryResult::Ok(_) => tracing::debug!(url, "summarized page"),
        SummaryResult::Empty => tracing::debug!(url, "nothing to summarize"),
        SummaryResult::Error(message) => {
            tracing::warn!(url, error = %message, "summarization failed")
        }
    }
    PageOutcome::summarized(content, summary)
}
