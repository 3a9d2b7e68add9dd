use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use leadflow_common::types::PricingModel;
use leadflow_engine::contracts::CreateContract;

use crate::rest::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateContractBody {
    pub broker_id: Uuid,
    pub category_id: Option<Uuid>,
    pub pricing_model: PricingModel,
    pub price_per_lead_cents: Option<i64>,
    pub monthly_fee_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
    pub followup_days: Option<i32>,
}

#[derive(Deserialize)]
pub struct ConfirmBody {
    pub token: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateContractBody>,
) -> ApiResult<Json<Value>> {
    let outcome = state
        .services
        .contracts
        .create(CreateContract {
            broker_id: body.broker_id,
            category_id: body.category_id,
            pricing_model: body.pricing_model,
            price_per_lead_cents: body.price_per_lead_cents,
            monthly_fee_cents: body.monthly_fee_cents,
            revenue_share_percent: body.revenue_share_percent,
            followup_days: body.followup_days,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "contract": outcome.contract,
        "email_sent": outcome.email_sent,
        "email_error": outcome.email_error,
    })))
}

/// Customer-facing: the sanitized contract behind the token link.
pub async fn view(
    State(state): State<Arc<AppState>>,
    Path((id, token)): Path<(Uuid, String)>,
) -> ApiResult<Json<Value>> {
    let view = state.services.contracts.view(id, &token).await?;
    Ok(Json(json!({"contract": view})))
}

/// Customer-facing: one-way activation.
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ConfirmBody>,
) -> ApiResult<Json<Value>> {
    let contract = state.services.contracts.confirm(id, &body.token).await?;
    Ok(Json(json!({"success": true, "contract": contract})))
}
