//! Batch scoring command

use std::path::PathBuf;

use anyhow::Result;

use crate::config::BatchConfig;
use crate::engine::{run_batch, SchemaMode};

/// Score a CSV table; unset paths fall back to the batch configuration
pub async fn batch(
    config: BatchConfig,
    model_path: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    schema_mode: SchemaMode,
) -> Result<()> {
    let model_path = model_path.unwrap_or(config.model_path);
    let input = input.unwrap_or(config.input_path);
    let output = output.unwrap_or(config.output_path);

    let summary = tokio::task::spawn_blocking(move || {
        run_batch(&model_path, &input, &output, schema_mode)
    })
    .await??;

    println!(
        "Scored {} rows -> {}",
        summary.rows,
        summary.output.display()
    );
    Ok(())
}
