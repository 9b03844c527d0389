use serde::Serialize;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Body returned once a scheduled drain cycle finishes.
#[derive(Debug, Serialize)]
pub struct DrainTriggerResponse {}
