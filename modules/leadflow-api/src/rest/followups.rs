use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use leadflow_common::types::FollowupResponse;
use leadflow_engine::followup::SubmitFollowup;

use crate::rest::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct SubmitBody {
    pub token: String,
    pub status: FollowupResponse,
    pub notes: Option<String>,
    pub commission_amount_cents: Option<i64>,
}

/// Customer-facing: the assignment + lead view behind the feedback link.
pub async fn view(
    State(state): State<Arc<AppState>>,
    Path((id, token)): Path<(Uuid, String)>,
) -> ApiResult<Json<Value>> {
    let view = state.services.followups.view(id, &token).await?;
    Ok(Json(json!({"followup": view})))
}

/// Customer-facing: apply one follow-up response.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitBody>,
) -> ApiResult<Json<Value>> {
    let assignment = state
        .services
        .followups
        .submit(
            id,
            &body.token,
            SubmitFollowup {
                status: body.status,
                notes: body.notes,
                commission_amount_cents: body.commission_amount_cents,
            },
        )
        .await?;

    Ok(Json(json!({"success": true, "assignment": assignment})))
}
