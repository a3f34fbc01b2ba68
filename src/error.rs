//! Error taxonomy shared by the store, cache, reconciler and dispatcher
//!
//! Each variant carries a different remediation: a missing artifact means the
//! model has to be trained, a load failure means the artifact has to be fixed,
//! and prediction or schema failures usually point at the caller's features.

use std::path::PathBuf;

/// Errors surfaced by the inference core
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// No artifact at the resolved path
    #[error("model not found at {}; train it first", path.display())]
    ModelNotFound { path: PathBuf },

    /// Artifact exists but could not be turned into a bundle
    #[error("failed to load model from {}: {source}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    /// Payload does not match the model's feature schema (strict mode only)
    #[error("feature schema mismatch: missing {missing:?}, unexpected {unexpected:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// The estimator rejected the aligned input
    #[error("prediction failed: {0}")]
    Prediction(String),

    /// Identifier cannot be mapped to a path under the models root
    #[error("invalid model name: {0:?}")]
    InvalidModelName(String),
}

impl ServeError {
    /// Whether the failure is attributable to the caller's request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServeError::Prediction(_)
                | ServeError::SchemaMismatch { .. }
                | ServeError::InvalidModelName(_)
        )
    }
}

/// Underlying cause of a [`ServeError::ModelLoad`]
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed YAML artifact: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported artifact format: .{0}")]
    UnsupportedFormat(String),

    #[error("invalid estimator: {0}")]
    Invalid(String),
}

/// Failure reported by an estimator while scoring
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimateError {
    #[error("expected {expected} features, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("estimator is not fitted")]
    NotFitted,

    #[error("estimator does not support {0}")]
    Unsupported(&'static str),

    /// The estimator itself is broken; the input is not to blame
    #[error("corrupt estimator: {0}")]
    Defect(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classes() {
        assert!(ServeError::Prediction("bad".into()).is_client_error());
        assert!(ServeError::InvalidModelName("../x".into()).is_client_error());
        assert!(!ServeError::ModelNotFound {
            path: PathBuf::from("models/latest/m.json")
        }
        .is_client_error());
        assert!(!ServeError::ModelLoad {
            path: PathBuf::from("m.json"),
            source: LoadError::UnsupportedFormat("pkl".into()),
        }
        .is_client_error());
    }

    #[test]
    fn test_not_found_message_hints_training() {
        let err = ServeError::ModelNotFound {
            path: PathBuf::from("models/latest/model_test_lgbm.json"),
        };
        let msg = err.to_string();
        assert!(msg.contains("models/latest/model_test_lgbm.json"));
        assert!(msg.contains("train"));
    }
}
