use crate::classifier::ClassifierConfig;
use crate::scrapers::{PinnedLayout, Timings};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const DEFAULT_PROFILE_BASE_URL: &str = "https://www.compass.com/agents/";
const DEFAULT_CLASSIFIER_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CLASSIFIER_MODEL: &str = "gpt-4o-mini";
const DEFAULT_CLASSIFIER_MAX_TOKENS: u32 = 5;
const CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(
    name = "agent-listing-scout",
    about = "Pulls an agent's first listing (address, days on market, a room photo)"
)]
pub struct Cli {
    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Verbose logging and page captures when a profile has no listings
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    /// JSON file overriding the pinned page layout
    #[arg(long, env = "LAYOUT_FILE")]
    pub layout: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long, env = "HEADED")]
    pub headed: bool,
}

/// Process-wide settings, loaded once at startup and never changed
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub debug: bool,
    pub headless: bool,
    pub endpoint_credential: String,
    pub profile_base_url: String,
    pub layout: PinnedLayout,
    pub timings: Timings,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    pub fn load(cli: Cli) -> Result<Self> {
        let endpoint_credential = load_secret("API_KEY", Path::new("secrets/api_key.txt"))?;
        let classifier_key = load_secret("OPENAI_API_KEY", Path::new("secrets/openai_key.txt"))?;

        let layout = match &cli.layout {
            Some(path) => {
                info!("Using layout from {}", path.display());
                PinnedLayout::from_file(path)?
            }
            None => PinnedLayout::default(),
        };

        let max_tokens = match env::var("CLASSIFIER_MAX_TOKENS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid CLASSIFIER_MAX_TOKENS value '{raw}'"))?,
            Err(_) => DEFAULT_CLASSIFIER_MAX_TOKENS,
        };

        Ok(Self {
            bind: cli.bind,
            debug: cli.debug,
            headless: !cli.headed,
            endpoint_credential,
            profile_base_url: env_or("PROFILE_BASE_URL", DEFAULT_PROFILE_BASE_URL),
            layout,
            timings: Timings::default(),
            classifier: ClassifierConfig {
                api_key: classifier_key,
                base_url: env_or("CLASSIFIER_BASE_URL", DEFAULT_CLASSIFIER_BASE_URL),
                model: env_or("CLASSIFIER_MODEL", DEFAULT_CLASSIFIER_MODEL),
                max_tokens,
                timeout: CLASSIFIER_TIMEOUT,
            },
        })
    }
}

/// Read a secret from `var`, falling back to the contents of `file`
pub fn load_secret(var: &str, file: &Path) -> Result<String> {
    if let Some(value) = env::var(var).ok().and_then(non_blank) {
        return Ok(value);
    }

    if file.exists() {
        let contents = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        if let Some(value) = non_blank(contents) {
            info!("Loaded {} from {}", var, file.display());
            return Ok(value);
        }
    }

    bail!("{} is not set and {} is missing or empty", var, file.display())
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .and_then(non_blank)
        .unwrap_or_else(|| default.to_string())
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
