//! Schema handler

use axum::{extract::State, Json};
use serde_json::Value;

use crate::{AppError, AppResult, AppState};

/// Feature name to `{min, max, std, mean}`, `signal` excluded.
pub async fn get(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let schema = serde_json::to_value(state.stats.schema())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(schema))
}
