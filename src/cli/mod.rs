//! CLI commands
//!
//! `serve` runs the HTTP API, `predict` scores one row, `batch` scores a CSV
//! table, `export` writes an interchange artifact and `list` shows what is
//! available under the models directory.

mod batch;
mod export;
mod list;
mod predict;
mod serve;

pub use batch::batch;
pub use export::export;
pub use list::list;
pub use predict::predict;
pub use serve::{serve, ServeOverrides};

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::ServeConfig;
use crate::engine::{InferenceService, ModelCache, SchemaMode};
use crate::loader::ModelStore;

/// Tabserve - inference service for tabular models
#[derive(Parser)]
#[command(name = "tabserve")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML, or JSON by extension)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the prediction server
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Directory holding `latest/<model>.json` artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Model used when a request names none
        #[arg(long)]
        default_model: Option<String>,

        /// How to treat features that do not match the model schema
        #[arg(long, value_enum)]
        schema_mode: Option<SchemaMode>,

        /// Load the default model before accepting requests
        #[arg(long)]
        preload: bool,
    },

    /// Predict a single row
    Predict {
        /// Feature mapping as a JSON object, e.g. '{"koi_period": 3.5}'
        features: String,

        /// Model identifier under `<models_dir>/latest`
        #[arg(long, short)]
        model: Option<String>,

        /// Directory holding `latest/<model>.json` artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// How to treat features that do not match the model schema
        #[arg(long, value_enum)]
        schema_mode: Option<SchemaMode>,
    },

    /// Score a CSV table and write it back with a prediction column
    Batch {
        /// Model artifact path
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Input CSV
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Output CSV
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// How to treat columns that do not match the model schema
        #[arg(long, value_enum)]
        schema_mode: Option<SchemaMode>,
    },

    /// Convert a native artifact into the interchange format
    Export {
        /// Native artifact to convert
        model_path: PathBuf,
    },

    /// List available models
    List {
        /// Show detailed information
        #[arg(long, short)]
        verbose: bool,

        /// Directory holding `latest/<model>.json` artifacts
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
}

/// Configuration from `path`, or defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<ServeConfig> {
    match path {
        Some(path) => {
            let config = ServeConfig::from_file(path)?;
            tracing::debug!(path = %path.display(), "Loaded configuration");
            Ok(config)
        }
        None => Ok(ServeConfig::default()),
    }
}

/// Build the inference service described by `config`
pub fn build_service(config: &ServeConfig) -> InferenceService {
    InferenceService::new(
        ModelStore::new(&config.models_dir),
        ModelCache::new(config.cache_capacity),
    )
    .with_schema_mode(config.schema_mode)
}
