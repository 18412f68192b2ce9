//! Recall CLI entry point.

use anyhow::Result;
use clap::Parser;
use recall::cli::{commands, Cli, Commands};
use recall::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already carry the key.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("recall={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Chat { model, session } => {
            commands::run_chat(model.clone(), session.clone(), settings).await?;
        }

        Commands::Ask {
            question,
            no_tools,
            model,
        } => {
            commands::run_ask(question, *no_tools, model.clone(), settings).await?;
        }

        Commands::Email { task, model } => {
            commands::run_email(task, model.clone(), settings).await?;
        }

        Commands::Profile { question, model } => {
            commands::run_profile(question, model.clone(), settings).await?;
        }

        Commands::Sessions { action } => {
            commands::run_sessions(action, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
