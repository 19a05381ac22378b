//! Telegram Bot API transport.
//!
//! Provides the [`ChatTransport`] seam the responder writes through, the
//! HTTP client behind it, long-poll update delivery, and the classification
//! of transport failures into retryable-transient vs. fatal.

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::BotApi;
pub use error::{Result, TransportError};
pub use retry::{with_retry, RetryPolicy};
pub use types::{Chat, IncomingMessage, Update, User};

use async_trait::async_trait;
use relay_core::{ChatId, MessageId};

/// Outbound side of the chat platform. The responder talks only to this
/// trait so tests can substitute a recording fake.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new message to a chat, returning the platform-assigned id.
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        disable_link_preview: bool,
    ) -> Result<MessageId>;

    /// Replace the text of a previously sent message.
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        disable_link_preview: bool,
    ) -> Result<()>;
}
