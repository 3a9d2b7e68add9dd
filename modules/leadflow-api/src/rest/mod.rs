//! REST handlers. One error wrapper maps domain errors onto HTTP statuses;
//! handlers stay thin and push the work into the engine services.

pub mod admin;
pub mod assign;
pub mod contracts;
pub mod cron;
pub mod followups;
pub mod invoices;
pub mod packages;
pub mod payments;
pub mod webhook;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::error;

use leadflow_common::LeadflowError;

pub type ApiResult<T> = Result<T, ApiError>;

pub struct ApiError(LeadflowError);

impl From<LeadflowError> for ApiError {
    fn from(e: LeadflowError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LeadflowError::Validation(_) | LeadflowError::Transition { .. } => {
                StatusCode::BAD_REQUEST
            }
            LeadflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeadflowError::NotFound(_) => StatusCode::NOT_FOUND,
            LeadflowError::Conflict(_) => StatusCode::CONFLICT,
            LeadflowError::Database(_)
            | LeadflowError::Payment(_)
            | LeadflowError::Email(_)
            | LeadflowError::Config(_)
            | LeadflowError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
        }

        (
            status,
            Json(serde_json::json!({"error": self.0.to_string()})),
        )
            .into_response()
    }
}
