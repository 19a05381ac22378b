use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use relay_bot::config::Config;
use relay_bot::dispatch::run_dispatcher;
use relay_bot::Relay;
use relay_core::{ChatId, RecordStore, UserId};
use relay_llm::OpenAiClient;
use relay_store::SqliteRecordStore;
use relay_telegram::BotApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(config.debug);

    log::info!("starting relay bot");
    log::info!("  model: {}", config.model);
    log::info!("  completion base url: {}", config.llm_base_url);
    log::info!("  db path: {}", config.db_path.display());

    let store = SqliteRecordStore::new(&config.db_path);
    store.init().await.context("initialize record store")?;
    let store: Arc<dyn RecordStore> = Arc::new(store);

    // First run: the admin's private chat starts out whitelisted so the bot
    // is usable before any /add_whitelist.
    if store.authorized_chats().await?.is_empty() {
        store.authorize(ChatId(config.admin_id)).await?;
        log::info!("whitelist bootstrapped with admin chat {}", config.admin_id);
    }

    let api = Arc::new(BotApi::new(&config.bot_token));
    let me = api.get_me().await.context("identity probe failed")?;
    log::info!(
        "bot id: {} (@{})",
        me.id,
        me.username.as_deref().unwrap_or("unknown")
    );

    let mut client = OpenAiClient::new(&config.api_key)
        .with_base_url(&config.llm_base_url)
        .with_model(&config.model);
    if let Some(template) = &config.system_prompt {
        client = client.with_system_prompt(template);
    }

    let relay = Arc::new(Relay::new(
        store,
        Arc::new(client),
        api.clone(),
        me.id,
        UserId(config.admin_id),
    ));

    run_dispatcher(relay, api).await.context("update loop failed")
}

fn init_logging(debug: bool) {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
    } else {
        let level = if debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new().filter_level(level).init();
    }
}
