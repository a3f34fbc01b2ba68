//! List models command

use anyhow::Result;

use crate::config::ServeConfig;
use crate::loader::{load_bundle, ModelStore, LATEST_DIR};

/// List artifacts under `<models_dir>/latest`
pub async fn list(config: ServeConfig, verbose: bool) -> Result<()> {
    let store = ModelStore::new(&config.models_dir);
    let latest = store.models_root().join(LATEST_DIR);

    if !latest.exists() {
        println!("No models directory found at: {}", latest.display());
        println!("\nSet TABSERVE_MODELS_DIR or pass --models-dir.");
        return Ok(());
    }

    println!("Models in {}:\n", latest.display());

    let models = store.list_available()?;
    if models.is_empty() {
        println!("  No models found.");
        println!("\nTo add models:");
        println!("  - Place <name>.json artifacts in {}", latest.display());
        println!("  - Use 'tabserve export <path>' to produce interchange copies");
        return Ok(());
    }

    for model in &models {
        let marker = if model.name == config.default_model {
            " [default]"
        } else {
            ""
        };
        println!("  {} ({}){}", model.name, model.format.name(), marker);

        if verbose {
            print_model_details(&model.path);
        }
    }

    Ok(())
}

fn print_model_details(path: &std::path::Path) {
    println!("    Path: {}", path.display());

    match load_bundle(path) {
        Ok(bundle) => {
            println!("    Kind: {}", bundle.estimator().kind_name());
            println!("    Capability: {:?}", bundle.capability());
            match bundle.feature_names() {
                Some(names) => println!("    Features: {}", names.len()),
                None => println!(
                    "    Features: {} (names unknown)",
                    bundle.estimator().num_features()
                ),
            }
        }
        Err(e) => println!("    Error: {}", e),
    }

    if let Ok(metadata) = std::fs::metadata(path) {
        let size_kb = metadata.len() as f64 / 1024.0;
        if size_kb > 1024.0 {
            println!("    Size: {:.2} MB", size_kb / 1024.0);
        } else {
            println!("    Size: {:.2} KB", size_kb);
        }
    }

    println!();
}
