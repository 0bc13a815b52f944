use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ptgen::app::{AppContext, GenRequest};
use ptgen::cli::{commands, Cli, Commands};
use ptgen::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Serve { bind } => {
            commands::serve(ctx, bind).await?;
        }
        Commands::Gen {
            url,
            site,
            sid,
            json,
        } => {
            let request = GenRequest {
                url,
                site,
                sid,
                ..Default::default()
            };
            commands::generate(&ctx, request, json).await?;
        }
        Commands::Search { query, source } => {
            commands::search(&ctx, &query, &source).await?;
        }
        Commands::Purge => {
            commands::purge(&ctx)?;
        }
    }

    Ok(())
}
