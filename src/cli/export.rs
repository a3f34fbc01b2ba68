//! Interchange export command

use std::path::PathBuf;

use anyhow::Result;

use crate::export::export_to_interchange;

/// Write the interchange form of a native artifact next to it
pub async fn export(model_path: PathBuf) -> Result<()> {
    let output = tokio::task::spawn_blocking(move || export_to_interchange(model_path)).await??;
    println!("Exported {}", output.display());
    Ok(())
}
