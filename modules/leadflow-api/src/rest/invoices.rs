use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use leadflow_common::LeadflowError;

use crate::rest::ApiResult;
use crate::AppState;

/// The printable invoice document: invoice, line items, and the billed
/// broker.
pub async fn document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let invoice = state
        .store
        .invoice(id)
        .await?
        .ok_or_else(|| LeadflowError::NotFound(format!("invoice {id}")))?;
    let items = state.store.invoice_items(id).await?;
    let broker = state.store.broker(invoice.broker_id).await?;

    Ok(Json(json!({
        "invoice": invoice,
        "items": items,
        "broker": broker,
    })))
}
