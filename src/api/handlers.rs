use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use crate::data_models::{AggregateResult, SearchQuery};
use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;

use super::models::{ErrorResponse, HealthResponse, SearchSummaryParams};

type ApiError = (StatusCode, Json<ErrorResponse>);

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn search_summary_handler(
    State(orchestrator): State<Arc<Orchestrator>>,
    Query(params): Query<SearchSummaryParams>,
) -> Result<Json<AggregateResult>, ApiError> {
    let q = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| {
            error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "query parameter `q` is required",
            )
        })?;

    let query = SearchQuery::new(q).with_locale(
        params.country.unwrap_or_else(|| "US".to_string()),
        params.ui_lang.unwrap_or_else(|| "en-US".to_string()),
    );

    let result = orchestrator
        .run(&query)
        .await
        .map_err(map_pipeline_error)?;
    Ok(Json(result))
}

fn map_pipeline_error(err: PipelineError) -> ApiError {
    match err {
        PipelineError::InvalidQuery(_) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string())
        }
        PipelineError::Configuration(ref message) => {
            tracing::error!(error = %err, "search request rejected");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
        PipelineError::Http(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
        PipelineError::UpstreamRejected { .. } | PipelineError::UpstreamUnavailable(_) => {
            error_response(StatusCode::BAD_GATEWAY, &err.to_string())
        }
    }
}

fn error_response(status: StatusCode, detail: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.to_string(),
        }),
    )
}
