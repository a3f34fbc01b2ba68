//! HTTP server command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::ServeConfig;
use crate::engine::SchemaMode;
use crate::error::ServeError;
use crate::server;

/// Flags that override the configuration file
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub models_dir: Option<PathBuf>,
    pub default_model: Option<String>,
    pub schema_mode: Option<SchemaMode>,
}

impl ServeOverrides {
    fn apply(self, config: &mut ServeConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(dir) = self.models_dir {
            config.models_dir = dir;
        }
        if let Some(model) = self.default_model {
            config.default_model = model;
        }
        if let Some(mode) = self.schema_mode {
            config.schema_mode = mode;
        }
    }
}

/// Start the prediction server
pub async fn serve(mut config: ServeConfig, overrides: ServeOverrides, preload: bool) -> Result<()> {
    overrides.apply(&mut config);

    let service = Arc::new(super::build_service(&config));
    tracing::info!(
        models_dir = %config.models_dir.display(),
        default_model = %config.default_model,
        cache_capacity = config.cache_capacity,
        schema_mode = ?config.schema_mode,
        "Inference service ready"
    );

    // Pre-load model if requested; a missing artifact is not fatal
    if preload {
        tracing::info!("Pre-loading model: {}", config.default_model);
        let loader = service.clone();
        let name = config.default_model.clone();
        match tokio::task::spawn_blocking(move || loader.bundle(&name)).await? {
            Ok(_) => tracing::info!("Model loaded successfully"),
            Err(e @ ServeError::ModelNotFound { .. }) => tracing::warn!("{}", e),
            Err(e) => return Err(e.into()),
        }
    }

    server::start(service, config.default_model, config.server).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = ServeConfig::default();
        ServeOverrides {
            port: Some(9100),
            models_dir: Some(PathBuf::from("/tmp/models")),
            schema_mode: Some(SchemaMode::Strict),
            ..Default::default()
        }
        .apply(&mut config);

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.models_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.schema_mode, SchemaMode::Strict);
        assert_eq!(config.default_model, "model_test_lgbm");
    }
}
