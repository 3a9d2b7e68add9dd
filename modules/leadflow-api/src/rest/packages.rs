use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use leadflow_common::types::DistributionType;
use leadflow_engine::packages::CreatePackage;

use crate::rest::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreatePackageBody {
    pub broker_id: Uuid,
    pub name: String,
    pub total_leads: Option<i32>,
    pub price_cents: i64,
    pub distribution_type: DistributionType,
    pub leads_per_day: Option<i32>,
    pub category_id: Option<Uuid>,
    /// Explicit selection: exactly these leads are reserved until payment.
    pub lead_ids: Option<Vec<Uuid>>,
}

#[derive(Deserialize, Default)]
pub struct DeliverBody {
    pub count: Option<i32>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePackageBody>,
) -> ApiResult<Json<Value>> {
    let outcome = state
        .services
        .packages
        .create(CreatePackage {
            broker_id: body.broker_id,
            name: body.name,
            total_leads: body.total_leads,
            price_cents: body.price_cents,
            distribution_type: body.distribution_type,
            leads_per_day: body.leads_per_day,
            category_id: body.category_id,
            lead_ids: body.lead_ids,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "package": outcome.package,
        "invoice": outcome.invoice,
        "email_sent": outcome.email_sent,
        "email_error": outcome.email_error,
    })))
}

/// Manual delivery trigger for an active package. `count` overrides the
/// package's daily rate; send `{}` to use it.
pub async fn deliver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<DeliverBody>,
) -> ApiResult<Json<Value>> {
    let report = state.services.packages.deliver(id, body.count).await?;
    Ok(Json(json!({"success": true, "delivery": report})))
}
