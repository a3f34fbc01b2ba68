//! Tabserve - inference service for trained tabular models
//!
//! Loads serialized estimators from a models directory, keeps them in a
//! bounded in-memory cache, reconciles request features with the schema each
//! model was trained on and returns predictions with class probabilities.
//!
//! # Architecture
//!
//! - **model**: tree ensembles and linear models, normalized into a bundle
//! - **loader**: model store, artifact detection and native JSON artifacts
//! - **engine**: LRU cache, schema reconciliation, prediction dispatch, batch
//! - **export**: YAML interchange artifacts
//! - **server** / **cli**: HTTP and command-line surfaces
//!
//! # Artifact Formats
//!
//! - Native JSON (`<models_dir>/latest/<name>.json`)
//! - Interchange YAML (tree ensemble / linear graphs)
//!
//! # Example
//!
//! ```bash
//! # Start server
//! tabserve serve --models-dir ./models --port 8000
//!
//! # Score one row
//! tabserve predict '{"koi_period": 3.5, "koi_depth": 120.0}'
//!
//! # Score a table
//! tabserve batch --input data/processed/inference_sample.csv
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod loader;
pub mod model;
pub mod server;

// Re-export key types
pub use config::{BatchConfig, ServeConfig, ServerConfig};
pub use engine::{FeaturePayload, InferenceService, ModelCache, PredictionResult, SchemaMode};
pub use error::{EstimateError, LoadError, ServeError};
pub use loader::{load_bundle, ModelStore};
pub use model::{Capability, Estimator, Label, ModelBundle};
