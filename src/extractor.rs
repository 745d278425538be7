use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::data_models::{CONTENT_PREVIEW_CHARS, truncate_chars};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Elements whose text is never part of the readable content.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "noscript", "svg", "iframe", "form",
    "template", "head",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4",
    "h5", "h6", "tr", "table", "blockquote", "pre",
];

/// Page bodies are read up to this many bytes; the rest is discarded.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

const CONTENT_SELECTORS: &[&str] = &["article", "main", "[role=\"main\"]", "body"];

/// Turns a URL into readable plain text.
///
/// Failure to fetch or extract is expected and reported as `None`.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Option<String>;
}

pub struct HttpPageExtractor {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpPageExtractor {
    pub fn new(timeout: Duration) -> Result<HttpPageExtractor> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("failed to build page fetch client")?;
        Ok(HttpPageExtractor {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    async fn fetch_page(&self, url: &str) -> Result<(Option<String>, String)> {
        let mut res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            bail!("fetch returned status {status}");
        }
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());
        if let Some(len) = res.content_length() {
            if len as usize > self.max_body_bytes {
                tracing::debug!(url, len, "page larger than body limit, reading a prefix");
            }
        }

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = res.chunk().await? {
            let room = self.max_body_bytes - bytes.len();
            if chunk.len() >= room {
                bytes.extend_from_slice(&chunk[..room]);
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok((content_type, String::from_utf8_lossy(&bytes).into_owned()))
    }
}

#[async_trait]
impl PageExtractor for HttpPageExtractor {
    async fn extract(&self, url: &str) -> Option<String> {
        let (content_type, body) = match self.fetch_page(url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(url, error = %format!("{e:#}"), "error fetching page");
                return None;
            }
        };

        let text = match content_type.as_deref() {
            None => extract_text(&body),
            Some(ct) if ct.contains("html") => extract_text(&body),
            Some(ct) if ct.starts_with("text/") => normalise_whitespace(&body),
            Some(ct) => {
                tracing::debug!(url, content_type = ct, "skipping non-text page");
                return None;
            }
        };

        if text.is_empty() {
            tracing::debug!(url, "no readable text extracted");
            return None;
        }
        Some(truncate_chars(&text, CONTENT_PREVIEW_CHARS).to_string())
    }
}

/// Readable text of an HTML document, whitespace-normalised.
///
/// The first non-empty match of `article`, `main`, `[role="main"]`, `body` is
/// used as the content root. Returns an empty string when nothing is readable.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let mut raw = String::new();
            push_text(element, &mut raw);
            let text = normalise_whitespace(&raw);
            if !text.is_empty() {
                return text;
            }
        }
    }

    // Fragments without a body still parse into <html>; fall back to the root.
    let mut raw = String::new();
    push_text(document.root_element(), &mut raw);
    normalise_whitespace(&raw)
}

fn push_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED_TAGS.contains(&name) {
                continue;
            }
            let is_block = BLOCK_TAGS.contains(&name);
            if is_block {
                out.push('\n');
            }
            push_text(child_element, out);
            if is_block {
                out.push('\n');
            }
        }
    }
}

/// Collapse runs of spaces to one and drop blank lines.
fn normalise_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
