//! Cron-style sweep endpoints. All of them are GETs so any scheduler can
//! hit them, and all of them are idempotent per row — a doubled tick skips
//! already-processed work.

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use leadflow_common::LeadflowError;
use leadflow_engine::outbox;
use metaads_client::MetaAdsClient;

use crate::rest::ApiResult;
use crate::AppState;

/// Send due follow-up requests for revenue-share assignments.
pub async fn followups(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let report = state.services.followups.sweep().await?;
    Ok(Json(json!({"success": true, "report": report})))
}

/// Deliver due distributed packages. Skips entirely on weekends.
pub async fn packages(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let report = state.services.packages.sweep().await?;
    Ok(Json(json!({"success": true, "report": report})))
}

/// Retry pending outbox emails.
pub async fn outbox(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let report = outbox::dispatch_pending(&state.store, state.mailer.as_ref()).await?;
    Ok(Json(json!({"success": true, "report": report})))
}

/// Roll settled commissions into monthly invoices.
pub async fn commissions(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let report = state.services.billing.run_commission_invoices().await?;
    Ok(Json(json!({"success": true, "report": report})))
}

/// Bill active subscription contracts for the current month.
pub async fn subscriptions(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let report = state.services.billing.run_subscription_invoices().await?;
    Ok(Json(json!({"success": true, "report": report})))
}

/// Pull new leads from the ad platform.
pub async fn adsync(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let token = state.config.meta_access_token.clone().ok_or_else(|| {
        LeadflowError::Validation("META_ACCESS_TOKEN is not configured".to_string())
    })?;

    let client = MetaAdsClient::new(token);
    let report = state.services.ingest.sync_ad_platform(&client).await?;
    Ok(Json(json!({"success": true, "report": report})))
}
