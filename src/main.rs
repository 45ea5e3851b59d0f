//! FinBot - AI financial assistant CLI
//!
#![doc = "FinBot - AI financial assistant CLI"]
#![doc = "Main entry point for the FinBot chat application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use finbot::auth::SignupCredentials;
use finbot::cli::{Cli, Commands};
use finbot::commands::{self, account};
use finbot::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    if let Some(db_path) = &cli.storage_path {
        tracing::info!("Using storage DB override: {}", db_path);
    }

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let storage_path = cli.storage_path.clone();

    // Execute command
    match cli.command {
        Commands::Chat { user, provider } => {
            tracing::info!("Starting interactive chat mode");
            if let Some(p) = &provider {
                tracing::debug!("Using provider override: {}", p);
            }

            commands::chat::run_chat(config, storage_path, user).await?;
            Ok(())
        }
        Commands::History { command } => {
            commands::history::handle_history(command, &config.chat, storage_path.as_deref())?;
            Ok(())
        }
        Commands::Login { email, password } => {
            let records = commands::open_record_store(storage_path.as_deref())?;
            account::handle_login(&config.auth, records, email, password).await
        }
        Commands::Signup {
            name,
            email,
            password,
            confirm_password,
        } => {
            let records = commands::open_record_store(storage_path.as_deref())?;
            let credentials = SignupCredentials {
                name,
                email,
                password,
                confirm_password,
            };
            account::handle_signup(&config.auth, records, credentials).await
        }
        Commands::Logout => {
            let records = commands::open_record_store(storage_path.as_deref())?;
            account::handle_logout(&config.auth, records)
        }
        Commands::Whoami => {
            let records = commands::open_record_store(storage_path.as_deref())?;
            account::handle_whoami(&config.auth, records)
        }
        Commands::Account { command } => {
            tracing::info!("Starting account command");
            let records = commands::open_record_store(storage_path.as_deref())?;
            account::handle_account(command, &config.auth, records).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "finbot=debug" } else { "finbot=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
