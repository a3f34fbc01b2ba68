//! Artifact path resolution and format detection

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::{LoadError, ServeError};

/// Extension of native artifacts under `<models_root>/latest`
pub const ARTIFACT_EXTENSION: &str = "json";

/// Directory holding the current generation of trained models
pub const LATEST_DIR: &str = "latest";

/// On-disk artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// JSON bundle or bare estimator written by the training pipeline
    Native,
    /// Flat YAML graph written by `tabserve export`
    Interchange,
}

impl ArtifactFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactFormat::Native => "native",
            ArtifactFormat::Interchange => "interchange",
        }
    }
}

/// Detect the artifact format from the file extension
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<ArtifactFormat, LoadError> {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext {
        "json" => Ok(ArtifactFormat::Native),
        "yaml" | "yml" => Ok(ArtifactFormat::Interchange),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

/// Map a model identifier to `<models_root>/latest/<identifier>.json`
///
/// The identifier must be a single plain path component so that callers
/// cannot address files outside the models root.
pub fn artifact_path(models_root: &Path, identifier: &str) -> Result<PathBuf, ServeError> {
    let mut components = Path::new(identifier).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if identifier.is_empty() || !single_normal || identifier.contains(['/', '\\']) {
        return Err(ServeError::InvalidModelName(identifier.to_string()));
    }

    Ok(models_root
        .join(LATEST_DIR)
        .join(format!("{}.{}", identifier, ARTIFACT_EXTENSION)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_convention() {
        let path = artifact_path(Path::new("/srv/models"), "model_test_lgbm").unwrap();
        assert_eq!(
            path,
            PathBuf::from("/srv/models/latest/model_test_lgbm.json")
        );
    }

    #[test]
    fn test_artifact_path_rejects_traversal() {
        for bad in ["", "..", ".", "../secrets", "a/b", "/etc/passwd", "a\\b"] {
            assert!(
                matches!(
                    artifact_path(Path::new("models"), bad),
                    Err(ServeError::InvalidModelName(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("m.json").unwrap(), ArtifactFormat::Native);
        assert_eq!(detect_format("m.yaml").unwrap(), ArtifactFormat::Interchange);
        assert_eq!(detect_format("m.yml").unwrap(), ArtifactFormat::Interchange);
        assert!(matches!(
            detect_format("m.joblib"),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "joblib"
        ));
    }
}
