//! Core inference engine
//!
//! This module provides the prediction pipeline shared by the HTTP server and
//! the batch driver:
//! - ModelCache: bounded LRU of loaded bundles
//! - Schema reconciliation: payload and table alignment
//! - Dispatch: capability invocation and output normalization
//! - InferenceService: store + cache + schema policy
//! - Batch: CSV scoring

mod batch;
mod cache;
mod dispatch;
mod schema;
mod service;

pub use batch::{feature_matrix, predict_table, run_batch, BatchSummary, Table, PREDICTION_COLUMN};
pub use cache::{ModelCache, DEFAULT_CACHE_CAPACITY};
pub use dispatch::{predict_one, predict_rows, PredictionResult};
pub use schema::{
    align, plan_columns, AlignedRow, ColumnPlan, ColumnSource, FeaturePayload, SchemaMode,
    SchemaReport, FILL_VALUE,
};
pub use service::InferenceService;
