//! Prediction handler

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::Value;

use crate::inference::assemble_batch;
use crate::models::PredictRequest;
use crate::validation::normalize_events;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: Value,
}

/// Validate, standardize and score a batch of events.
///
/// The body is parsed as JSON whatever its `Content-Type`.
pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<PredictResponse>> {
    let body: Value = serde_json::from_slice(&body)?;
    if !body.is_object() {
        return Err(AppError::BadRequest("Request body must be a JSON object".to_string()));
    }
    let req: PredictRequest = serde_json::from_value(body)?;

    let events = normalize_events(req.events, &state.stats, state.extra_fields)?;
    if events.is_empty() {
        return Err(AppError::BadRequest("No events to predict".to_string()));
    }

    let input = assemble_batch(&events, state.stats.len())?;
    tracing::debug!(rows = input.nrows(), cols = input.ncols(), "Running prediction");

    // Inference is synchronous; keep it off the async workers.
    let model = state.model.clone();
    let prediction = tokio::task::spawn_blocking(move || model.predict(input)).await??;

    Ok(Json(PredictResponse {
        prediction: prediction.to_json(),
    }))
}
