//! HTTP server for inference
//!
//! Exposes health, prediction and model listing endpoints over a shared
//! [`InferenceService`].

mod handlers;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::engine::InferenceService;

pub use handlers::{AppState, ErrorResponse, PredictRequest, PredictResponse};
pub use routes::api_routes;

/// Build the application router with its middleware
pub fn app(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .merge(api_routes())
        .layer(DefaultBodyLimit::max(config.max_body_size));

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }
    if config.request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

/// Start the HTTP inference server
pub async fn start(
    service: Arc<InferenceService>,
    default_model: String,
    config: ServerConfig,
) -> Result<()> {
    let state = Arc::new(AppState::new(service, default_model));
    let app = app(state, &config);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health - Health check");
    tracing::info!("  GET  /models - List models");
    tracing::info!("  POST /predict - Predict one row");

    axum::serve(listener, app).await?;

    Ok(())
}
