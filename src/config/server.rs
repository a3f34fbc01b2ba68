//! Listener and middleware settings for `tabserve serve`

use serde::{Deserialize, Serialize};

/// Prediction requests carry one row of features; this leaves room for a few
/// thousand named columns.
pub const DEFAULT_MAX_BODY_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind, `0.0.0.0` for all
    pub host: String,
    pub port: u16,
    /// Answer cross-origin requests from browser frontends
    pub cors_enabled: bool,
    /// Attach the `tower_http` trace layer
    pub request_logging: bool,
    /// Largest accepted `/predict` body in bytes; larger bodies get 413
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_enabled: true,
            request_logging: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ServerConfig {
    /// `host:port` handed to the listener; the host may be a name
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
