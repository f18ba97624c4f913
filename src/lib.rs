//! Higgs boson classifier - HTTP inference service
//!
//! Serves a pre-trained model behind two versioned endpoints:
//!
//! ```text
//!   GET  /v1/schema   feature name -> {min, max, std, mean}
//!   POST /v1/predict  {"events": [...]} -> {"prediction": [[...]]}
//! ```
//!
//! Incoming events are checked against the stats table bounds and
//! standardized before they reach the model.

pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod validation;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use inference::Model;
use models::StatsTable;
use validation::ExtraFieldPolicy;

/// Shared application state, built once before serving and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub stats: Arc<StatsTable>,
    pub model: Arc<dyn Model>,
    pub extra_fields: ExtraFieldPolicy,
}

impl AppState {
    pub fn new(stats: StatsTable, model: impl Model + 'static, extra_fields: ExtraFieldPolicy) -> Self {
        Self {
            stats: Arc::new(stats),
            model: Arc::new(model),
            extra_fields,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    // Versioned API, open to any origin
    let api_routes = Router::new()
        .route("/v1/schema", get(handlers::schema::get))
        .route("/v1/predict", post(handlers::predict::predict))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        );

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
