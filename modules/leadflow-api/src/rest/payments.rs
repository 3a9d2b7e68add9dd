use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use leadflow_common::LeadflowError;
use leadflow_engine::payments::Confirmation;

use crate::rest::ApiResult;
use crate::AppState;

fn confirmation_response(confirmation: Confirmation) -> Json<Value> {
    match confirmation {
        Confirmation::Paid(invoice) => Json(json!({
            "success": true,
            "status": "paid",
            "invoice": invoice,
        })),
        Confirmation::AlreadyPaid(invoice) => Json(json!({
            "success": true,
            "status": "paid",
            "already_paid": true,
            "invoice": invoice,
        })),
        Confirmation::Ignored => Json(json!({"success": true, "ignored": true})),
    }
}

/// Provider webhook. Signature is verified over the raw body before anything
/// is parsed.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| LeadflowError::Forbidden("missing stripe-signature header".to_string()))?;

    let confirmation = state
        .services
        .payments
        .confirm_webhook(&body, signature, &state.config.stripe_webhook_secret)
        .await?;

    Ok(confirmation_response(confirmation))
}

#[derive(Deserialize)]
pub struct VerifyBody {
    pub invoice_number: String,
}

/// Manual fallback: confirm by invoice number when the webhook didn't fire.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyBody>,
) -> ApiResult<Json<Value>> {
    let confirmation = state
        .services
        .payments
        .verify_by_number(&body.invoice_number)
        .await?;
    Ok(confirmation_response(confirmation))
}

#[derive(Deserialize)]
pub struct SuccessQuery {
    pub invoice_number: String,
}

/// The buyer's post-payment redirect lands here; it drives the same
/// verification as the manual fallback.
pub async fn success_redirect(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuccessQuery>,
) -> ApiResult<Json<Value>> {
    let confirmation = state
        .services
        .payments
        .verify_by_number(&query.invoice_number)
        .await?;
    Ok(confirmation_response(confirmation))
}
