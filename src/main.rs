use std::sync::Arc;

use anyhow::Context;

use kosher_bot::bot::{Bot, BotDeps, StateRegister};
use kosher_bot::channels::{Channel, TelegramChannel};
use kosher_bot::config::BotConfig;
use kosher_bot::llm::{LlmConfig, create_provider};
use kosher_bot::phone::RussianPhoneValidator;
use kosher_bot::store::{LibSqlBackend, SubmissionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export TELEGRAM_TOKEN=... OPENROUTER_API_KEY=... OPENROUTER_BASE_URL=...");
        std::process::exit(1);
    });

    eprintln!("✡️  Kosher Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Provider: {}", config.provider_base_url);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Workers: {}\n", config.max_workers);

    let llm = create_provider(&LlmConfig {
        api_key: config.provider_api_key.clone(),
        base_url: config.provider_base_url.clone(),
        model: config.model.clone(),
    })?;

    let store: Arc<dyn SubmissionStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path, config.store_timeout)
            .await
            .with_context(|| format!("opening database at {}", config.db_path.display()))?,
    );

    let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(config.telegram_token.clone()));
    if let Err(e) = channel.health_check().await {
        tracing::warn!(error = %e, "Telegram health check failed, continuing");
    }

    let deps = BotDeps {
        channel,
        states: Arc::new(StateRegister::new()),
        store,
        llm,
        phone: Arc::new(RussianPhoneValidator::new()),
        content: config.content.clone(),
        provider_timeout: config.provider_timeout,
    };

    Bot::new(deps, config.max_workers).run().await?;

    Ok(())
}
