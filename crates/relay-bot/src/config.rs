use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "relay-bot")]
#[command(about = "Telegram relay for a streaming chat-completion API")]
#[command(version)]
pub struct Config {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Completion API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Completion API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub llm_base_url: String,

    /// Completion model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-3.5-turbo")]
    pub model: String,

    /// System instruction template; `{current_time}` is substituted per request
    #[arg(long, env = "SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// User id of the admin; seeds the whitelist on first run
    #[arg(long, env = "ADMIN_ID")]
    pub admin_id: i64,

    /// Path of the SQLite database
    #[arg(long, env = "RELAY_DB_PATH", default_value = "relay.db")]
    pub db_path: PathBuf,

    /// Enable debug logging
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
