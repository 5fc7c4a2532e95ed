//! Carelog - On-device conversation store CLI
//!
#![doc = "Carelog - On-device conversation store CLI"]
#![doc = "Main entry point for history maintenance and snapshot transfer."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use carelog::cli::{Cli, Commands};
use carelog::commands;
use carelog::config::Config;
use carelog::history::ConversationRepository;
use carelog::store::SledBlobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // The repository and its store are owned here and passed by
    // reference to the command handlers.
    let store = match &config.storage.data_dir {
        Some(dir) => {
            tracing::info!("Using data directory override: {}", dir);
            SledBlobStore::open_at(
                std::path::Path::new(dir).join("history"),
                config.storage.capacity_bytes,
            )?
        }
        None => SledBlobStore::open_default(config.storage.capacity_bytes)?,
    };
    let mut repository = ConversationRepository::new(store, config.history.clone());

    // Execute command
    match cli.command {
        Commands::History { command } => {
            tracing::debug!("Starting history command");
            commands::history::handle_history(&mut repository, command)?;
            Ok(())
        }
        Commands::Export { output } => {
            tracing::debug!("Starting snapshot export");
            commands::transfer::handle_export(&repository, output)?;
            Ok(())
        }
        Commands::Import { file } => {
            tracing::debug!("Starting snapshot import from {}", file.display());
            commands::transfer::handle_import(&mut repository, &file)?;
            Ok(())
        }
        Commands::Usage => {
            commands::transfer::handle_usage(&repository)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("carelog=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
