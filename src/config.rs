//! Configuration types.
//!
//! Everything is read once from the environment at startup. The three
//! credentials/endpoints are required; the process refuses to start without
//! them.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default completion model routed through OpenRouter.
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

/// Default database file, matching the legacy deployment's file name.
pub const DEFAULT_DB_PATH: &str = "./kosher_bot.db";

pub const DEFAULT_LESSONS_URL: &str = "https://example.com/torah-lessons";
pub const DEFAULT_GOODS_URL: &str = "https://example.com/jewish-goods";
pub const DEFAULT_SUPPORT_HANDLE: &str = "@support_username";

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub telegram_token: SecretString,
    /// API key for the completion provider.
    pub provider_api_key: SecretString,
    /// Base endpoint of the OpenRouter API (e.g. `https://openrouter.ai/api/v1`).
    pub provider_base_url: String,
    /// Model identifier sent with every completion request.
    pub model: String,
    /// SQLite/libSQL file holding roots submissions.
    pub db_path: PathBuf,
    /// Maximum number of events handled concurrently.
    pub max_workers: usize,
    /// Budget for a single completion request.
    pub provider_timeout: Duration,
    /// Budget for a single store operation (including lock wait).
    pub store_timeout: Duration,
    /// Static content shown by the menu handlers.
    pub content: ContentConfig,
}

/// Links and handles shown in static replies.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    pub lessons_url: String,
    pub goods_url: String,
    pub support_handle: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            lessons_url: DEFAULT_LESSONS_URL.to_string(),
            goods_url: DEFAULT_GOODS_URL.to_string(),
            support_handle: DEFAULT_SUPPORT_HANDLE.to_string(),
        }
    }
}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.into()));

        let telegram_token = SecretString::from(required("TELEGRAM_TOKEN")?);
        let provider_api_key = SecretString::from(required("OPENROUTER_API_KEY")?);
        let provider_base_url = required("OPENROUTER_BASE_URL")?
            .trim_end_matches('/')
            .to_string();

        let max_workers = parse_or("KOSHER_BOT_MAX_WORKERS", get("KOSHER_BOT_MAX_WORKERS"), 8)?;
        if max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "KOSHER_BOT_MAX_WORKERS".into(),
                message: "must be at least 1".into(),
            });
        }
        let provider_timeout_secs = parse_or(
            "KOSHER_BOT_PROVIDER_TIMEOUT_SECS",
            get("KOSHER_BOT_PROVIDER_TIMEOUT_SECS"),
            30,
        )?;
        let store_timeout_secs = parse_or(
            "KOSHER_BOT_STORE_TIMEOUT_SECS",
            get("KOSHER_BOT_STORE_TIMEOUT_SECS"),
            30,
        )?;

        let defaults = ContentConfig::default();

        Ok(Self {
            telegram_token,
            provider_api_key,
            provider_base_url,
            model: get("KOSHER_BOT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            db_path: PathBuf::from(
                get("KOSHER_BOT_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            ),
            max_workers,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            store_timeout: Duration::from_secs(store_timeout_secs),
            content: ContentConfig {
                lessons_url: get("KOSHER_BOT_LESSONS_URL").unwrap_or(defaults.lessons_url),
                goods_url: get("KOSHER_BOT_GOODS_URL").unwrap_or(defaults.goods_url),
                support_handle: get("KOSHER_BOT_SUPPORT_HANDLE").unwrap_or(defaults.support_handle),
            },
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value:?}: {e}"),
        }),
    }
}
