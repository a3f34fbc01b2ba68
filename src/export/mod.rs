//! Export to the interchange format
//!
//! The interchange artifact is a flat, language-neutral description of the
//! model: tree ensembles become parallel node and target arrays with a
//! post-transform, linear models become a row-major coefficient matrix. It is
//! written as YAML next to the source artifact and loads back through the
//! regular model store.

mod interchange;

pub use interchange::{
    Graph, InterchangeModel, LinearGraph, NodeMode, PostTransform, TreeEnsembleGraph,
    FORMAT_VERSION,
};

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::error::LoadError;
use crate::loader::{self, ArtifactFormat};
use crate::model::{Estimator, ModelBundle};

/// Read an interchange artifact into an estimator and its feature schema
pub fn read_interchange(path: &Path) -> Result<(Estimator, Option<Vec<String>>), LoadError> {
    let content = std::fs::read_to_string(path)?;
    let model: InterchangeModel = serde_yaml::from_str(&content)?;
    model.into_parts()
}

/// Write `bundle` as an interchange artifact at `output`
pub fn export_bundle(bundle: &ModelBundle, output: &Path) -> Result<()> {
    let model = InterchangeModel::from_bundle(bundle);
    let content = serde_yaml::to_string(&model)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, content)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}

/// Convert the native artifact at `model_path` and return the new artifact path
///
/// The interchange artifact is written next to the source with a `.yaml`
/// extension.
pub fn export_to_interchange<P: AsRef<Path>>(model_path: P) -> Result<PathBuf> {
    let model_path = model_path.as_ref();
    let bundle = loader::load_bundle(model_path)?;

    if bundle.format() == ArtifactFormat::Interchange {
        return Err(anyhow!(
            "{} is already an interchange artifact",
            model_path.display()
        ));
    }

    let output = model_path.with_extension("yaml");
    export_bundle(&bundle, &output)?;

    tracing::info!(
        source = %model_path.display(),
        output = %output.display(),
        "Exported model to interchange format"
    );

    Ok(output)
}
