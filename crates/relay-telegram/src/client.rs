use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use relay_core::{ChatId, MessageId};

use crate::error::{Result, TransportError};
use crate::types::{ApiResponse, SentMessage, Update, User};
use crate::ChatTransport;

pub struct BotApi {
    client: Client,
    base_url: String,
    token: String,
}

impl BotApi {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.telegram.org".to_string(),
            token: token.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &Value) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await?;
        let body: ApiResponse<T> = response.json().await?;

        if !body.ok {
            let code = body.error_code.unwrap_or_default();
            if code == 429 {
                let retry_after = body
                    .parameters
                    .and_then(|parameters| parameters.retry_after)
                    .unwrap_or(1);
                return Err(TransportError::RateLimited { retry_after });
            }
            return Err(TransportError::Api {
                code,
                description: body
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        body.result.ok_or_else(|| TransportError::Api {
            code: 0,
            description: "ok response without result".to_string(),
        })
    }

    /// Long-poll for updates. Blocks server-side for up to `timeout_secs`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut payload = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call("getUpdates", &payload).await
    }

    /// Identity probe; used at startup to learn the bot's own user id.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({})).await
    }
}

#[async_trait]
impl ChatTransport for BotApi {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        disable_link_preview: bool,
    ) -> Result<MessageId> {
        let sent: SentMessage = self
            .call(
                "sendMessage",
                &json!({
                    "chat_id": chat_id.0,
                    "text": text,
                    "disable_web_page_preview": disable_link_preview,
                }),
            )
            .await?;
        Ok(sent.message_id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        disable_link_preview: bool,
    ) -> Result<()> {
        let _edited: SentMessage = self
            .call(
                "editMessageText",
                &json!({
                    "chat_id": chat_id.0,
                    "message_id": message_id.0,
                    "text": text,
                    "disable_web_page_preview": disable_link_preview,
                }),
            )
            .await?;
        Ok(())
    }
}
