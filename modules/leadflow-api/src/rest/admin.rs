//! Reference-data endpoints: brokers, categories, lead sources, and the
//! lead list. The minimum surface the back office needs to operate.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use leadflow_engine::tokens::random_token;
use leadflow_store::{NewBroker, NewCategory, NewSource};

use crate::rest::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateBrokerBody {
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCategoryBody {
    pub name: String,
    pub position: Option<i32>,
}

#[derive(Deserialize)]
pub struct CreateSourceBody {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ListLeadsQuery {
    pub limit: Option<i64>,
}

pub async fn create_broker(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBrokerBody>,
) -> ApiResult<Json<Value>> {
    let broker = state
        .store
        .insert_broker(NewBroker {
            name: body.name,
            company: body.company,
            email: body.email,
            phone: body.phone,
        })
        .await?;
    Ok(Json(json!({"success": true, "broker": broker})))
}

pub async fn list_brokers(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let brokers = state.store.brokers().await?;
    Ok(Json(json!({"brokers": brokers})))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCategoryBody>,
) -> ApiResult<Json<Value>> {
    let category = state
        .store
        .insert_category(NewCategory {
            name: body.name,
            position: body.position.unwrap_or(0),
        })
        .await?;
    Ok(Json(json!({"success": true, "category": category})))
}

pub async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let categories = state.store.categories().await?;
    Ok(Json(json!({"categories": categories})))
}

/// Creating a source mints its webhook token; the response is the only
/// place the operator reads it from.
pub async fn create_source(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSourceBody>,
) -> ApiResult<Json<Value>> {
    let source = state
        .store
        .insert_source(NewSource {
            name: body.name,
            webhook_token: random_token(),
        })
        .await?;
    Ok(Json(json!({"success": true, "source": source})))
}

pub async fn list_sources(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let sources = state.store.sources().await?;
    Ok(Json(json!({"sources": sources})))
}

pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLeadsQuery>,
) -> ApiResult<Json<Value>> {
    let leads = state.store.leads(query.limit.unwrap_or(100)).await?;
    Ok(Json(json!({"leads": leads})))
}
