//! Native JSON artifacts
//!
//! Two shapes are accepted. A structured bundle is an object with a `model`
//! key holding the estimator and optional `feature_names` (or `features`)
//! keys. Anything else is read as a bare estimator.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::model::Estimator;

/// Read a native artifact into an estimator and its feature schema
pub fn read_native(path: &Path) -> Result<(Estimator, Option<Vec<String>>), LoadError> {
    let content = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    unwrap_artifact(document)
}

/// Normalize either artifact shape
///
/// Feature names recorded on the estimator win over the ones declared by the
/// bundle. An empty list counts as unknown.
pub fn unwrap_artifact(document: Value) -> Result<(Estimator, Option<Vec<String>>), LoadError> {
    let (estimator, declared) = match document {
        Value::Object(mut map) if map.contains_key("model") => {
            let model = map.remove("model").unwrap_or(Value::Null);
            let estimator: Estimator = serde_json::from_value(model)?;
            let declared = match take_names(&mut map, "feature_names")? {
                Some(names) => Some(names),
                None => take_names(&mut map, "features")?,
            };
            (estimator, declared)
        }
        other => (serde_json::from_value(other)?, None),
    };

    let names = match estimator.native_feature_names() {
        Some(native) if !native.is_empty() => Some(native.to_vec()),
        _ => declared,
    };

    Ok((estimator, names))
}

fn take_names(map: &mut Map<String, Value>, key: &str) -> Result<Option<Vec<String>>, LoadError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let names: Vec<String> = serde_json::from_value(value)
                .map_err(|e| LoadError::Invalid(format!("`{}` is not a list of names: {}", key, e)))?;
            Ok(if names.is_empty() { None } else { Some(names) })
        }
    }
}
