//! Inference service
//!
//! Ties the model store, the cache and the schema policy together. The HTTP
//! handlers and the CLI hold one instance behind an `Arc`.

use std::path::Path;
use std::sync::Arc;

use super::cache::ModelCache;
use super::dispatch::{predict_one, PredictionResult};
use super::schema::{align, FeaturePayload, SchemaMode};
use crate::error::ServeError;
use crate::loader::ModelStore;
use crate::model::ModelBundle;

pub struct InferenceService {
    store: ModelStore,
    cache: ModelCache,
    schema_mode: SchemaMode,
}

impl InferenceService {
    pub fn new(store: ModelStore, cache: ModelCache) -> Self {
        Self {
            store,
            cache,
            schema_mode: SchemaMode::default(),
        }
    }

    /// Set how payloads that do not match the model schema are handled
    pub fn with_schema_mode(mut self, mode: SchemaMode) -> Self {
        self.schema_mode = mode;
        self
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn schema_mode(&self) -> SchemaMode {
        self.schema_mode
    }

    /// Bundle for a model identifier, loading it on a cache miss
    pub fn bundle(&self, model_name: &str) -> Result<Arc<ModelBundle>, ServeError> {
        let path = self.store.resolve(model_name)?;
        tracing::info!(model = model_name, path = %path.display(), "Resolving model");
        self.bundle_at(&path)
    }

    /// Bundle for an explicit artifact path
    ///
    /// The artifact must still exist on disk; a cached bundle whose file was
    /// removed is dropped and reported as not found.
    pub fn bundle_at(&self, path: &Path) -> Result<Arc<ModelBundle>, ServeError> {
        if !path.exists() {
            if self.cache.invalidate(path) {
                tracing::warn!(path = %path.display(), "Artifact removed; dropping cached model");
            }
            return Err(ServeError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        self.cache
            .get_or_load(path, |p| self.store.load(p))
            .inspect_err(|e| {
                if let ServeError::ModelLoad { .. } = e {
                    tracing::error!(error = %e, "Failed to load model");
                }
            })
    }

    /// Align `payload` with the model schema and predict
    pub fn predict(
        &self,
        model_name: &str,
        payload: &FeaturePayload,
    ) -> Result<PredictionResult, ServeError> {
        let bundle = self.bundle(model_name)?;
        let row = align(payload, bundle.feature_names(), self.schema_mode)?;

        match predict_one(&bundle, &row.values) {
            Err(e @ ServeError::ModelLoad { .. }) => {
                // Force a fresh load on the next request for this model
                self.cache.invalidate(bundle.source());
                tracing::error!(error = %e, "Model failed during prediction");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(model = model_name, error = %e, "Prediction failed");
                Err(e)
            }
            ok => ok,
        }
    }
}
