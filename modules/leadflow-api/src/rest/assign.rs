use std::sync::Arc;

use axum::{
    extract::State,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use leadflow_common::types::PricingModel;
use leadflow_engine::assign::{AssignBulkRequest, AssignRequest};

use crate::rest::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct AssignBody {
    pub lead_id: Uuid,
    pub broker_id: Uuid,
    pub pricing_model: Option<PricingModel>,
    pub price_charged_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
}

#[derive(Deserialize)]
pub struct AssignBulkBody {
    pub lead_ids: Vec<Uuid>,
    pub broker_id: Uuid,
    pub pricing_model: Option<PricingModel>,
    pub price_charged_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
}

pub async fn assign(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AssignBody>,
) -> ApiResult<Json<Value>> {
    let outcome = state
        .services
        .assignments
        .assign(AssignRequest {
            lead_id: body.lead_id,
            broker_id: body.broker_id,
            pricing_model: body.pricing_model,
            price_cents: body.price_charged_cents,
            revenue_share_percent: body.revenue_share_percent,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "assignment": outcome.assignment,
        "invoice_created": outcome.invoice.is_some(),
        "invoice": outcome.invoice,
        "email_sent": outcome.email_sent,
        "email_error": outcome.email_error,
    })))
}

pub async fn assign_bulk(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AssignBulkBody>,
) -> ApiResult<Json<Value>> {
    let outcome = state
        .services
        .assignments
        .assign_bulk(AssignBulkRequest {
            lead_ids: body.lead_ids,
            broker_id: body.broker_id,
            pricing_model: body.pricing_model,
            price_cents: body.price_charged_cents,
            revenue_share_percent: body.revenue_share_percent,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "assignments": outcome.assignments,
        "invoice_created": outcome.invoice.is_some(),
        "invoice": outcome.invoice,
        "email_sent": outcome.email_sent,
        "email_error": outcome.email_error,
    })))
}
