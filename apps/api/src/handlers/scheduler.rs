use axum::Json;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use crate::dto::DrainTriggerResponse;
use crate::error::ApiResult;
use crate::state::AppState;


const UNSUPPORTED_CONTENT_TYPE: &str = "Content type is not supported.";

/// Runs one drain cycle over the configured subscription.
pub async fn run_scheduled_cleanup_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if !is_json_request(&headers) {
        warn!(
            content_type = ?headers.get(CONTENT_TYPE),
            "rejected scheduler trigger"
        );
        return Ok((StatusCode::UNSUPPORTED_MEDIA_TYPE, UNSUPPORTED_CONTENT_TYPE).into_response());
    }

    let report = state
        .drain_service
        .run_drain_cycle(&state.subscription_path, state.batch_size)
        .await?;

    info!(
        batches = report.batches,
        acknowledged = report.acknowledged,
        left_pending = report.left_pending,
        "scheduled cleanup finished"
    );

    Ok(Json(DrainTriggerResponse {}).into_response())
}

fn is_json_request(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}
