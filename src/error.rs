//! Error types for the bot.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Database operation {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {after:?}")]
    Timeout { provider: String, after: Duration },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} returned an empty completion")]
    EmptyResponse { provider: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures raised inside dialog handlers.
///
/// Every variant is recovered by the handler that raised it and turned into
/// a fixed user-facing reply; none of them reach the run loop.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Malformed input: {0}")]
    Format(String),

    #[error("Name is empty after sanitization")]
    InvalidName,

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Input length {length} outside allowed range 1..={max}")]
    InvalidLength { length: usize, max: usize },

    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Completion provider failed: {0}")]
    Provider(#[from] LlmError),
}

impl HandlerError {
    /// Validation failures leave the user in the same dialog state so they can retry.
    pub fn is_retryable_input(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::InvalidName | Self::InvalidPhone(_)
        )
    }
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
