use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabserve::cli::{Cli, Commands, ServeOverrides};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabserve=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = tabserve::cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            models_dir,
            default_model,
            schema_mode,
            preload,
        } => {
            let overrides = ServeOverrides {
                port,
                host,
                models_dir,
                default_model,
                schema_mode,
            };
            tabserve::cli::serve(config, overrides, preload).await?;
        }
        Commands::Predict {
            features,
            model,
            models_dir,
            schema_mode,
        } => {
            if let Some(dir) = models_dir {
                config.models_dir = dir;
            }
            if let Some(mode) = schema_mode {
                config.schema_mode = mode;
            }
            tabserve::cli::predict(config, model, features).await?;
        }
        Commands::Batch {
            model_path,
            input,
            output,
            schema_mode,
        } => {
            let mode = schema_mode.unwrap_or(config.schema_mode);
            tabserve::cli::batch(config.batch, model_path, input, output, mode).await?;
        }
        Commands::Export { model_path } => {
            tabserve::cli::export(model_path).await?;
        }
        Commands::List {
            verbose,
            models_dir,
        } => {
            if let Some(dir) = models_dir {
                config.models_dir = dir;
            }
            tabserve::cli::list(config, verbose).await?;
        }
    }

    Ok(())
}
