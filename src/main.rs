mod classifier;
mod config;
mod error;
mod models;
mod scrapers;
mod server;

use classifier::OpenAiRoomClassifier;
use clap::Parser;
use config::{AppConfig, Cli};
use scrapers::{ChromeLauncher, ExtractorSettings, ListingExtractor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over the debug flag
    let default_filter = if cli.debug {
        "info,agent_listing_scout=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!("🏠 Agent Listing Scout");

    let config = AppConfig::load(cli)?;

    let classifier = OpenAiRoomClassifier::new(config.classifier.clone())?;
    let launcher = ChromeLauncher::new(config.headless, config.timings.navigation_timeout);

    let extractor = ListingExtractor::new(
        Arc::new(launcher),
        Arc::new(classifier),
        Arc::new(config.layout.clone()),
        ExtractorSettings {
            endpoint_credential: config.endpoint_credential.clone(),
            profile_base_url: config.profile_base_url.clone(),
            timings: config.timings,
            debug_dir: config.debug.then(|| PathBuf::from("debug")),
        },
    );

    info!(
        "Profiles from {} | classifier model {}{}",
        config.profile_base_url,
        config.classifier.model,
        if config.debug { " | debug on" } else { "" }
    );

    server::serve(&config.bind, extractor).await
}
