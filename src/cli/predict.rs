//! Single-row prediction command

use anyhow::{Context, Result};

use crate::config::ServeConfig;
use crate::engine::FeaturePayload;

/// Predict one row and print the result as JSON
pub async fn predict(config: ServeConfig, model: Option<String>, features: String) -> Result<()> {
    let payload: FeaturePayload =
        serde_json::from_str(&features).context("features must be a JSON object of numbers")?;
    let model = model.unwrap_or_else(|| config.default_model.clone());
    let service = super::build_service(&config);

    let result = tokio::task::spawn_blocking(move || service.predict(&model, &payload)).await??;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
