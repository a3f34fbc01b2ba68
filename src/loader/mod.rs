//! Model store
//!
//! Resolves model identifiers to artifact paths and loads artifacts into
//! normalized [`ModelBundle`]s:
//! - Native JSON artifacts (structured bundle or bare estimator)
//! - Interchange YAML artifacts produced by [`crate::export`]

mod artifact;
mod detect;

pub use artifact::{read_native, unwrap_artifact};
pub use detect::{artifact_path, detect_format, ArtifactFormat, ARTIFACT_EXTENSION, LATEST_DIR};

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::error::{LoadError, ServeError};
use crate::model::ModelBundle;

/// Load an artifact at an explicit path
pub fn load_bundle<P: AsRef<Path>>(path: P) -> Result<ModelBundle, ServeError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ServeError::ModelNotFound {
            path: path.to_path_buf(),
        });
    }

    let load_error = |source: LoadError| ServeError::ModelLoad {
        path: path.to_path_buf(),
        source,
    };

    let format = detect_format(path).map_err(load_error)?;
    let (estimator, feature_names) = match format {
        ArtifactFormat::Native => read_native(path),
        ArtifactFormat::Interchange => crate::export::read_interchange(path),
    }
    .map_err(load_error)?;

    let bundle = ModelBundle::new(estimator, feature_names, format)
        .map_err(|e| load_error(LoadError::Invalid(e)))?
        .with_source(path);

    tracing::info!(
        path = %path.display(),
        kind = bundle.estimator().kind_name(),
        format = format.name(),
        features = ?bundle.feature_names().map(<[String]>::len),
        "Loaded model"
    );

    Ok(bundle)
}

/// Resolves identifiers under a models root and loads artifacts
#[derive(Debug, Clone)]
pub struct ModelStore {
    models_root: PathBuf,
}

impl ModelStore {
    pub fn new<P: Into<PathBuf>>(models_root: P) -> Self {
        Self {
            models_root: models_root.into(),
        }
    }

    pub fn models_root(&self) -> &Path {
        &self.models_root
    }

    /// Artifact path for a model identifier
    pub fn resolve(&self, identifier: &str) -> Result<PathBuf, ServeError> {
        artifact_path(&self.models_root, identifier)
    }

    /// Load the artifact at `path`
    pub fn load(&self, path: &Path) -> Result<ModelBundle, ServeError> {
        load_bundle(path)
    }

    /// List artifacts under `<models_root>/latest`
    pub fn list_available(&self) -> Result<Vec<AvailableModel>> {
        let latest = self.models_root.join(LATEST_DIR);
        let mut models = Vec::new();

        if !latest.exists() {
            return Ok(models);
        }

        for ext in ["json", "yaml", "yml"] {
            let pattern = latest.join(format!("*.{}", ext));
            for path in glob::glob(&pattern.to_string_lossy())?.filter_map(|r| r.ok()) {
                let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                    continue;
                };
                if let Ok(format) = detect_format(&path) {
                    models.push(AvailableModel { name, path, format });
                }
            }
        }

        models.sort_by(|a, b| a.name.cmp(&b.name).then(a.path.cmp(&b.path)));
        Ok(models)
    }
}

/// Artifact found on disk
#[derive(Debug, Clone, Serialize)]
pub struct AvailableModel {
    pub name: String,
    pub path: PathBuf,
    pub format: ArtifactFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{fixtures, Capability};
    use serde_json::json;

    fn write_latest(root: &Path, file: &str, content: &str) -> PathBuf {
        let dir = root.join(LATEST_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(file);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let path = store.resolve("model_test_lgbm").unwrap();
        assert!(path.ends_with("latest/model_test_lgbm.json"));
        assert!(matches!(
            store.load(&path),
            Err(ServeError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn test_corrupt_artifact_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_latest(dir.path(), "broken.json", "{ not json");
        assert!(matches!(
            load_bundle(&path),
            Err(ServeError::ModelLoad {
                source: LoadError::Json(_),
                ..
            })
        ));
    }

    #[test]
    fn test_unsupported_extension_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_latest(dir.path(), "model.joblib", "binary");
        assert!(matches!(
            load_bundle(&path),
            Err(ServeError::ModelLoad {
                source: LoadError::UnsupportedFormat(_),
                ..
            })
        ));
    }

    #[test]
    fn test_feature_count_mismatch_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = json!({ "model": fixtures::binary_gbdt(), "feature_names": ["a"] });
        let path = write_latest(dir.path(), "m.json", &doc.to_string());
        assert!(matches!(
            load_bundle(&path),
            Err(ServeError::ModelLoad {
                source: LoadError::Invalid(_),
                ..
            })
        ));
    }

    #[test]
    fn test_load_structured_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let doc = json!({ "model": fixtures::binary_gbdt(), "feature_names": ["a", "b", "c"] });
        let path = write_latest(dir.path(), "m.json", &doc.to_string());

        let bundle = load_bundle(&path).unwrap();
        assert_eq!(bundle.feature_names().unwrap(), ["a", "b", "c"]);
        assert_eq!(
            bundle.capability(),
            Capability::ProbabilisticPredictor { n_classes: 2 }
        );
        assert_eq!(bundle.format(), ArtifactFormat::Native);
    }

    #[test]
    fn test_list_available() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(store.list_available().unwrap().is_empty());

        write_latest(dir.path(), "b.json", "{}");
        write_latest(dir.path(), "a.yaml", "{}");
        write_latest(dir.path(), "notes.txt", "");

        let names: Vec<String> = store
            .list_available()
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
