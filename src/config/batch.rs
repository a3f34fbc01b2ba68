//! Batch scoring defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Paths used by `tabserve batch` when no flags are given
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Model artifact scored in batch mode
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Processed input table
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// Where the scored table is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models").join("lightgbm.json")
}

fn default_input_path() -> PathBuf {
    PathBuf::from("data")
        .join("processed")
        .join("inference_sample.csv")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("artifacts").join("batch_predictions.csv")
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            input_path: default_input_path(),
            output_path: default_output_path(),
        }
    }
}
