use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SearchSummaryParams {
    pub q: Option<String>,
    pub country: Option<String>,
    pub ui_lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}
