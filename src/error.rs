//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::inference::InferenceError;
use crate::validation::ValidationError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    // Event validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // Malformed request body
    #[error("{0}")]
    BadRequest(String),

    // Model errors
    #[error(transparent)]
    Inference(#[from] InferenceError),

    // Generic errors
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation(_) | AppError::BadRequest(_) => {
                tracing::warn!("Rejected request: {}", self);
            }
            AppError::Inference(err) => {
                tracing::error!("Inference error: {}", err);
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
            }
        }

        // Every request failure is reported to the client as a 400.
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}
