use std::net::SocketAddr;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing_subscriber::EnvFilter;

mod ai;
mod bot;
mod chat;
mod config;
mod db;
mod lang;
mod voice;

use chat::moderation::ProfanityFilter;
use chat::ChatPipeline;
use config::{AppConfig, DeployMode};
use db::Database;
use lang::detector::{LanguageDetector, LinguaSpanDetector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🤖 Starting Ziya...");

    // Load config; missing API keys stop the process here
    let config = AppConfig::from_env()?;
    tracing::info!("Config loaded. Model: {}", config.openrouter_model);

    // Initialize database
    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;
    tracing::info!("Conversation log ready at {}", config.database_url);

    // Initialize AI clients
    let detector = LanguageDetector::new(Box::new(LinguaSpanDetector::new()))
        .with_precedence(config.short_text_precedence);
    let generator = ai::llm::ResponseGenerator::from_config(&config)?;
    let transcriber = Arc::new(ai::stt::AssemblyAiClient::from_config(&config)?);
    let synthesizer = Arc::new(ai::tts::ElevenLabsClient::new(&config)?);

    // Build shared application state
    let state = Arc::new(bot::AppState {
        chat: ChatPipeline {
            detector,
            generator,
            db,
            filter: ProfanityFilter,
            history_limit: config.history_limit,
        },
        voice: voice::VoiceBridge::from_config(&config, transcriber, synthesizer),
        config: config.clone(),
    });

    // Create the Telegram bot
    let bot = Bot::new(&config.telegram_bot_token);

    // Build the dispatcher
    let handler = bot::build_handler();

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd.kind);
        })
        .enable_ctrlc_handler()
        .build();

    match &config.mode {
        DeployMode::Polling => {
            tracing::info!("Receiving updates by long polling");
            dispatcher.dispatch().await;
        }
        DeployMode::Webhook { base_url, port } => {
            let addr = SocketAddr::from(([0, 0, 0, 0], *port));
            let url = reqwest::Url::parse(&format!("{}/webhook", base_url))?;
            tracing::info!("Webhook set: {} (listening on {})", url, addr);

            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }

    Ok(())
}
