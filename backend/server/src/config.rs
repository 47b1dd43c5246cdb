use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use anyhow::{Context, Error, anyhow, bail};
use tracing::{info, warn};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly study assistant for Sri Lankan school \
students preparing for grade 5 scholarship, O/L and A/L examinations. Explain step by step, keep \
answers short, and reply in the language the student writes in (Sinhala, Tamil or English).";

pub const MAX_SESSION_TTL_MINS: i64 = 60 * 24 * 30;
pub const MAX_UPLOAD_MB: usize = 1024;

pub struct Config {
    pub port: u16,
    pub store_url: String,
    pub store_key: String,
    pub upload_bucket: String,
    pub snapshot_path: PathBuf,
    pub refresh_secs: u64,
    pub session_ttl_mins: i64,
    pub search_limit: usize,
    pub max_upload_mb: usize,
    pub allowed_origin: Option<String>,
    pub chat: Option<ChatConfig>,
}

pub struct ChatConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1111,
            store_url: "http://localhost:54321".to_string(),
            store_key: String::new(),
            upload_bucket: "papers".to_string(),
            snapshot_path: PathBuf::from("catalog.json"),
            refresh_secs: 300,
            session_ttl_mins: 120,
            search_limit: 6,
            max_upload_mb: 25,
            allowed_origin: None,
            chat: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        let chat = read_optional_secret("CHAT_API_KEY")
            .map(|api_key| -> Result<ChatConfig, Error> {
                Ok(ChatConfig {
                    api_url: try_load(
                        "CHAT_API_URL",
                        "https://generativelanguage.googleapis.com/v1beta",
                    )?,
                    api_key,
                    model: try_load("CHAT_MODEL", "gemini-2.0-flash")?,
                    system_prompt: try_load("CHAT_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT)?,
                })
            })
            .transpose()?;

        if chat.is_none() {
            warn!("CHAT_API_KEY not set, chat assistant disabled");
        }

        let config = Self {
            port: try_load("RUST_PORT", "1111")?,
            store_url: try_load("STORE_URL", "http://localhost:54321")?,
            store_key: read_secret("STORE_KEY")?,
            upload_bucket: try_load("UPLOAD_BUCKET", "papers")?,
            snapshot_path: try_load("SNAPSHOT_PATH", "catalog.json")?,
            refresh_secs: try_load("REFRESH_SECS", "300")?,
            session_ttl_mins: try_load("SESSION_TTL_MINS", "120")?,
            search_limit: try_load("SEARCH_LIMIT", "6")?,
            max_upload_mb: try_load("MAX_UPLOAD_MB", "25")?,
            allowed_origin: var("ALLOWED_ORIGIN"),
            chat,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=MAX_SESSION_TTL_MINS).contains(&self.session_ttl_mins) {
            bail!(
                "SESSION_TTL_MINS must be between 1 and {MAX_SESSION_TTL_MINS}, got {}",
                self.session_ttl_mins
            );
        }

        if !(1..=MAX_UPLOAD_MB).contains(&self.max_upload_mb) {
            bail!(
                "MAX_UPLOAD_MB must be between 1 and {MAX_UPLOAD_MB}, got {}",
                self.max_upload_mb
            );
        }

        Ok(())
    }

    pub fn body_limit(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, Error>
where
    T::Err: Display,
{
    parse_or_default(key, var(key), default)
}

fn parse_or_default<T: FromStr>(key: &str, value: Option<String>, default: &str) -> Result<T, Error>
where
    T::Err: Display,
{
    value
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value: {e}"))
}

/// Docker secret first, then a plain environment variable for local runs.
fn read_optional_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
        .or_else(|| env::var(secret_name).ok().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
}

fn read_secret(secret_name: &str) -> Result<String, Error> {
    read_optional_secret(secret_name)
        .with_context(|| format!("Secret {secret_name} missing from /run/secrets and environment"))
}
