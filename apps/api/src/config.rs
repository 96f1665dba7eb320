use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::ProviderId;
use crate::models::letter::UserProfile;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub profile: UserProfile,
    /// Command line of the requirements/draft tool, split on whitespace at spawn.
    pub extractor_command: String,
    pub extractor_timeout: Duration,
    pub provider_timeout: Duration,
    /// API keys of the providers that are configured. Absent providers fail on selection.
    pub credentials: HashMap<ProviderId, String>,
    pub ledger_database_url: String,
    pub cors_allow_origin: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            profile: UserProfile {
                name: require_env("PROFILE_NAME")?,
                email: require_env("PROFILE_EMAIL")?,
            },
            extractor_command: require_env("EXTRACTOR_COMMAND")?,
            extractor_timeout: secs_env("EXTRACTOR_TIMEOUT_SECS", 60)?,
            provider_timeout: secs_env("PROVIDER_TIMEOUT_SECS", 120)?,
            credentials: load_credentials(),
            ledger_database_url: std::env::var("LEDGER_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/applications.db".to_string()),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn secs_env(key: &str, default: u64) -> Result<Duration> {
    let secs = match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds"))?,
        Err(_) => default,
    };
    Ok(Duration::from_secs(secs))
}

/// Reads each provider's key from its own variable. Blank values count as unset.
fn load_credentials() -> HashMap<ProviderId, String> {
    ProviderId::ALL
        .into_iter()
        .filter_map(|provider| {
            let key = std::env::var(provider.spec().credential_key).ok()?;
            let key = key.trim();
            (!key.is_empty()).then(|| (provider, key.to_string()))
        })
        .collect()
}
