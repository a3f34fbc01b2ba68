//! Configuration system for tabserve
//!
//! ServeConfig gathers where models live, which model a request gets by
//! default, cache sizing, schema handling and the server/batch settings.
//! Every field has a default, so an empty file is a valid configuration.

mod batch;
mod server;

pub use batch::BatchConfig;
pub use server::{ServerConfig, DEFAULT_MAX_BODY_SIZE};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::{SchemaMode, DEFAULT_CACHE_CAPACITY};

/// Environment variable overriding the models directory
pub const MODELS_DIR_ENV: &str = "TABSERVE_MODELS_DIR";

/// Model used when a request names none
pub const DEFAULT_MODEL: &str = "model_test_lgbm";

/// Tabserve configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Root holding `latest/<id>.json` artifacts
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Model identifier used when a request omits `model_name`
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Maximum number of bundles kept in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default)]
    pub schema_mode: SchemaMode,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub batch: BatchConfig,
}

fn default_models_dir() -> PathBuf {
    std::env::var_os(MODELS_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("models"))
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl ServeConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load by extension: `.json` is JSON, anything else YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(path),
            _ => Self::from_yaml(path),
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            default_model: default_model(),
            cache_capacity: default_cache_capacity(),
            schema_mode: SchemaMode::default(),
            server: ServerConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}
