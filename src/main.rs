use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gar_push::config::{configure, Settings};
use gar_push::registry::{
    ArtifactRegistry, Authenticator, ConfigurableValidator, ImageRef, Pusher, TokenSource,
    AUTH_GUIDANCE,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (TOML or YAML); defaults to ./gar.toml when present
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that all required registry fields are set (no network access)
    CheckConfig,
    /// Validate the configuration, including the registry location
    Validate,
    /// Verify push permissions on the target repository
    Auth,
    /// Tag and push a local image to Artifact Registry
    Push {
        /// Local image to push (e.g., myapp:latest)
        image: String,
        /// Skip the permission check before pushing
        #[arg(long)]
        skip_auth: bool,
    },
}

fn print_auth_guidance() {
    for line in AUTH_GUIDANCE {
        eprintln!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for the artifact record
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    if let Commands::CheckConfig = &cli.command {
        match configure(settings.registry.clone()) {
            Ok(config) => {
                println!("✓ Configuration is valid");
                println!("  repository: {}", config.repository_resource());
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration error: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut registry =
        ArtifactRegistry::from_settings(Client::new(), &settings, TokenSource::Ambient);
    registry.configure(settings.registry.clone())?;

    match &cli.command {
        Commands::CheckConfig => {
            unreachable!("check-config is handled before the registry is built")
        }
        Commands::Validate => {
            registry.validate().await?;
            println!("✓ Configuration is valid");
        }
        Commands::Auth => {
            if let Err(e) = registry.validate_auth().await {
                eprintln!("✗ {}", e);
                let result = registry.authenticate().await?;
                print_auth_guidance();
                if !result.authenticated {
                    std::process::exit(1);
                }
            }
            println!("✓ Authenticated");
        }
        Commands::Push { image, skip_auth } => {
            registry.validate().await?;

            if !*skip_auth {
                if let Err(e) = registry.validate_auth().await {
                    let result = registry.authenticate().await?;
                    if !result.authenticated {
                        print_auth_guidance();
                        return Err(e.into());
                    }
                }
            }

            let image = ImageRef::parse(image)?;
            let artifact = registry.push(&image).await?;
            info!("Pushed {}", artifact.reference());
            println!("{}", serde_json::to_string(&artifact)?);
        }
    }

    Ok(())
}
