use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use leadflow_common::LeadflowError;
use leadflow_engine::ingest::IngestOutcome;

use crate::AppState;

fn outcome_response(outcome: IngestOutcome) -> Json<Value> {
    match outcome {
        IngestOutcome::Created(lead) => Json(json!({
            "success": true,
            "lead_id": lead.id,
            "lead_number": lead.lead_number,
        })),
        IngestOutcome::Duplicate { external_id } => Json(json!({
            "success": true,
            "duplicate": true,
            "external_id": external_id,
        })),
    }
}

/// `POST /webhook/{token}` — per-source webhook ingestion. An unknown or
/// inactive token is a 401, not a 403: the caller isn't authenticated at
/// all.
pub async fn source_webhook(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    match state.services.ingest.ingest_from_source(&token, body).await {
        Ok(outcome) => outcome_response(outcome).into_response(),
        Err(LeadflowError::Forbidden(msg)) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": msg})),
        )
            .into_response(),
        Err(e) => crate::rest::ApiError::from(e).into_response(),
    }
}

/// `POST /api/leads` — direct JSON ingestion for automation tools. Same
/// source tokens, carried in the body instead of the path.
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    Json(mut body): Json<Value>,
) -> impl IntoResponse {
    let Some(token) = body
        .as_object_mut()
        .and_then(|o| o.remove("source_token"))
        .and_then(|v| v.as_str().map(str::to_string))
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "source_token is required"})),
        )
            .into_response();
    };

    match state.services.ingest.ingest_from_source(&token, body).await {
        Ok(outcome) => outcome_response(outcome).into_response(),
        Err(LeadflowError::Forbidden(msg)) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": msg})),
        )
            .into_response(),
        Err(e) => crate::rest::ApiError::from(e).into_response(),
    }
}
