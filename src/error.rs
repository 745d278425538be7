//! Request-level failures of the search-and-summarize pipeline.
//!
//! Per-item failures (page extraction, summarization) never show up here; they
//! are recorded on the item itself.

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A credential or setting required for the request is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The search provider could not be reached (connection error, timeout).
    #[error("search provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The search provider answered with a non-2xx status.
    #[error("search provider returned {status}: {body_excerpt}")]
    UpstreamRejected { status: u16, body_excerpt: String },

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl PipelineError {
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            PipelineError::UpstreamUnavailable(_) | PipelineError::UpstreamRejected { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
