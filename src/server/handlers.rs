//! HTTP request handlers

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::engine::{FeaturePayload, InferenceService, PredictionResult};
use crate::error::ServeError;
use crate::loader::AvailableModel;

/// Shared application state
pub struct AppState {
    pub service: Arc<InferenceService>,
    pub default_model: String,
}

impl AppState {
    pub fn new<S: Into<String>>(service: Arc<InferenceService>, default_model: S) -> Self {
        Self {
            service,
            default_model: default_model.into(),
        }
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// List artifacts on disk and bundles held in the cache
pub async fn list_models(State(state): State<Arc<AppState>>) -> Response {
    let service = state.service.clone();
    let listed = tokio::task::spawn_blocking(move || {
        service
            .store()
            .list_available()
            .map(|available| (available, service.cache().loaded()))
    })
    .await;

    match listed {
        Ok(Ok((available, cached))) => (
            StatusCode::OK,
            Json(ModelsResponse {
                default_model: state.default_model.clone(),
                available,
                cached,
            }),
        )
            .into_response(),
        Ok(Err(e)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Single-row prediction endpoint
pub async fn predict(
    State(state): State<Arc<AppState>>,
    request: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(r) => r,
        Err(rejection) => {
            // Unusable feature values are a bad request; size limits keep their 413
            let status = match rejection.status() {
                StatusCode::UNPROCESSABLE_ENTITY => StatusCode::BAD_REQUEST,
                other => other,
            };
            return error_response(status, rejection.body_text());
        }
    };

    let model_name = request
        .model_name
        .unwrap_or_else(|| state.default_model.clone());
    let service = state.service.clone();

    let outcome =
        tokio::task::spawn_blocking(move || service.predict(&model_name, &request.features)).await;

    match outcome {
        Ok(Ok(result)) => (StatusCode::OK, Json(PredictResponse::from(result))).into_response(),
        Ok(Err(e)) => serve_error_response(&e),
        Err(e) => {
            tracing::error!(error = %e, "Prediction task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Map a core error onto the HTTP contract
fn serve_error_response(err: &ServeError) -> Response {
    match err {
        ServeError::ModelNotFound { .. } => {
            error_response(StatusCode::NOT_FOUND, "Model not found. Train first.".to_string())
        }
        ServeError::ModelLoad { .. } => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Model load error: {}", err),
        ),
        e if e.is_client_error() => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        e => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorResponse { detail })).into_response()
}

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: FeaturePayload,
    #[serde(default)]
    pub model_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: String,
    pub probabilities: Option<Vec<f64>>,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            prediction: result.prediction,
            probabilities: result.probabilities,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub default_model: String,
    pub available: Vec<AvailableModel>,
    pub cached: Vec<PathBuf>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                ServeError::ModelNotFound {
                    path: PathBuf::from("models/latest/x.json"),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ServeError::ModelLoad {
                    path: PathBuf::from("models/latest/x.json"),
                    source: LoadError::Invalid("bad".into()),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ServeError::Prediction("bad row".into()), StatusCode::BAD_REQUEST),
            (
                ServeError::SchemaMismatch {
                    missing: vec!["a".into()],
                    unexpected: vec![],
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                ServeError::InvalidModelName("../x".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(serve_error_response(&err).status(), status, "{:?}", err);
        }
    }

    #[test]
    fn test_request_model_name_is_optional() {
        let request: PredictRequest =
            serde_json::from_str(r#"{"features": {"koi_period": 1.5}}"#).unwrap();
        assert!(request.model_name.is_none());
        assert_eq!(request.features.get("koi_period"), Some(1.5));
    }
}
