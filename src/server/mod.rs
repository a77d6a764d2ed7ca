//! HTTP server for the webhook receiver.
//!
//! # Endpoints
//!
//! - `POST /webhook` (and `POST /`) - Handles a webhook delivery and returns
//!   its status line in a minimal HTML page
//! - `GET /webhook` (and `GET /`) - Returns a short greeting
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use crate::pipeline::Pipeline;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::{greeting_handler, webhook_handler};

/// Shared application state.
///
/// Handlers receive it through Axum's `State` extractor. The pipeline is
/// shared by all requests and holds no per-request data.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        AppState {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.pipeline)
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/", get(greeting_handler).post(webhook_handler))
        .route("/webhook", get(greeting_handler).post(webhook_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
