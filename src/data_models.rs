use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Number of search results that are fetched and summarized per query.
pub const MAX_RESULTS: usize = 7;

/// Length of the content preview handed to the summarizer, in characters.
pub const CONTENT_PREVIEW_CHARS: usize = 900;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub country: String,
    pub ui_lang: String,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> SearchQuery {
        SearchQuery {
            text: text.into(),
            country: "US".to_string(),
            ui_lang: "en-US".to_string(),
        }
    }

    pub fn with_locale(mut self, country: impl Into<String>, ui_lang: impl Into<String>) -> Self {
        self.country = country.into();
        self.ui_lang = ui_lang.into();
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchResultItem {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Outcome of one summarization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryResult {
    Ok(String),
    /// The input was blank, or the model answered without a summary.
    Empty,
    Error(String),
}

impl SummaryResult {
    pub fn text(&self) -> Option<&str> {
        match self {
            SummaryResult::Ok(text) => Some(text),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SummaryResult::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// What the pipeline produced for one search result.
///
/// `summary` is only ever set when `content_preview` holds non-empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    pub content_preview: Option<String>,
    pub summary: Option<SummaryResult>,
}

impl PageOutcome {
    pub fn no_content() -> PageOutcome {
        PageOutcome::default()
    }

    pub fn summarized(content_preview: String, summary: SummaryResult) -> PageOutcome {
        PageOutcome {
            content_preview: Some(content_preview),
            summary: Some(summary),
        }
    }

    pub fn summary_text(&self) -> Option<&str> {
        self.summary.as_ref().and_then(SummaryResult::text)
    }
}

// Only successful summaries are exposed as `summary`; failures go to `summary_error`.
impl Serialize for PageOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PageOutcome", 3)?;
        state.serialize_field("content_preview", &self.content_preview)?;
        state.serialize_field("summary", &self.summary_text())?;
        state.serialize_field(
            "summary_error",
            &self.summary.as_ref().and_then(SummaryResult::error),
        )?;
        state.end()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    #[serde(flatten)]
    pub item: SearchResultItem,
    #[serde(flatten)]
    pub outcome: PageOutcome,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    pub query: String,
    pub country: String,
    pub ui_lang: String,
    pub results: Vec<ResultEntry>,
    pub combined_summary: Option<String>,
}

impl AggregateResult {
    pub fn new(query: &SearchQuery, results: Vec<ResultEntry>) -> AggregateResult {
        let summaries: Vec<&str> = results
            .iter()
            .filter_map(|entry| entry.outcome.summary_text())
            .filter(|text| !text.trim().is_empty())
            .collect();
        let combined_summary = if summaries.is_empty() {
            None
        } else {
            Some(summaries.join(" "))
        };

        AggregateResult {
            query: query.text.clone(),
            country: query.country.clone(),
            ui_lang: query.ui_lang.clone(),
            results,
            combined_summary,
        }
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[test]
fn test_truncate_chars() {
    assert_eq!(truncate_chars("hello", 10), "hello");
    assert_eq!(truncate_chars("hello", 5), "hello");
    assert_eq!(truncate_chars("hello", 3), "hel");
    assert_eq!(truncate_chars("", 3), "");
    // multi-byte characters count once each
    assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
    assert_eq!(truncate_chars("日本語のテキスト", 3), "日本語");
}

#[test]
fn test_page_outcome_serializes_only_successful_summary() {
    let ok = PageOutcome::summarized("text".into(), SummaryResult::Ok("short".into()));
    let json = serde_json::to_value(&ok).unwrap();
    assert_eq!(json["summary"], "short");
    assert!(json["summary_error"].is_null());

    let failed = PageOutcome::summarized("text".into(), SummaryResult::Error("status 503".into()));
    let json = serde_json::to_value(&failed).unwrap();
    assert!(json["summary"].is_null());
    assert_eq!(json["summary_error"], "status 503");
    assert_eq!(json["content_preview"], "text");
}

#[test]
fn test_result_entry_is_flat() {
    let entry = ResultEntry {
        item: SearchResultItem {
            title: Some("Rust".into()),
            url: "https://www.rust-lang.org".into(),
            description: None,
        },
        outcome: PageOutcome::no_content(),
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["title"], "Rust");
    assert_eq!(json["url"], "https://www.rust-lang.org");
    assert!(json["description"].is_null());
    assert!(json["content_preview"].is_null());
    assert!(json["summary"].is_null());
}

#[test]
fn test_combined_summary_skips_blank_and_failed() {
    let entry = |url: &str, summary: SummaryResult| ResultEntry {
        item: SearchResultItem {
            title: None,
            url: url.to_string(),
            description: None,
        },
        outcome: PageOutcome::summarized("page text".into(), summary),
    };
    let results = vec![
        entry("https://a", SummaryResult::Ok("A".into())),
        entry("https://b", SummaryResult::Ok("".into())),
        entry("https://c", SummaryResult::Ok("  ".into())),
        entry("https://d", SummaryResult::Empty),
        entry("https://e", SummaryResult::Error("status 500: oops".into())),
        entry("https://f", SummaryResult::Ok("C".into())),
    ];

    let aggregate = AggregateResult::new(&SearchQuery::new("blank"), results);
    assert_eq!(aggregate.combined_summary.as_deref(), Some("A C"));

    let only_blank = vec![entry("https://b", SummaryResult::Ok(String::new()))];
    let aggregate = AggregateResult::new(&SearchQuery::new("blank"), only_blank);
    assert_eq!(aggregate.combined_summary, None);
}
