//! App idea analysis endpoint

use agc_common::{AppIdea, ComplianceReport};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::{ApiError, ApiResult, AppState};

/// Message returned to clients for any upstream failure
pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to analyze app idea";

/// POST /api/analyze request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub app_idea: String,
}

/// GET /api/analyze/limits response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsResponse {
    pub min_idea_chars: usize,
    pub max_idea_chars: usize,
}

/// GET /api/analyze/limits
///
/// Input length bounds, so the form can check them before submitting.
pub async fn get_limits(State(state): State<AppState>) -> Json<LimitsResponse> {
    Json(LimitsResponse {
        min_idea_chars: state.limits.min_chars,
        max_idea_chars: state.limits.max_chars,
    })
}

/// POST /api/analyze
///
/// Validates the idea length, forwards it to the model and returns the
/// normalized compliance report. Upstream details are logged and kept for
/// `/health`, never returned to the client.
pub async fn analyze_app_idea(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<ComplianceReport>> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected analyze request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;

    let idea = AppIdea::parse(&request.app_idea, &state.limits)?;

    let analyzer = state.analyzer.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Analysis backend is not configured (missing API key)".to_string())
    })?;

    match analyzer.analyze(&idea).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            error!("Error analyzing app idea: {}", e);
            state.record_error(e.to_string()).await;
            Err(ApiError::Internal(ANALYSIS_FAILED_MESSAGE.to_string()))
        }
    }
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analyze", post(analyze_app_idea))
        .route("/api/analyze/limits", get(get_limits))
}
