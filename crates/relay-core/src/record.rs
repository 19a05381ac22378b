use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// One sent-or-received chat message participating in a reply thread.
///
/// Records are append-only: once written under a [`MessageKey`] they are
/// never updated or deleted, so the stored thread structure is a stable log
/// of the chat.
///
/// [`MessageKey`]: crate::ids::MessageKey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// True if the message was produced by the bot, false for a human.
    pub from_bot: bool,
    /// The message content exactly as sent or received.
    pub text: String,
    /// The message this one replies to; `None` for a conversation root.
    pub reply_to: Option<MessageId>,
}

impl MessageRecord {
    /// A message received from a human.
    pub fn from_user(text: impl Into<String>, reply_to: Option<MessageId>) -> Self {
        Self {
            from_bot: false,
            text: text.into(),
            reply_to,
        }
    }

    /// A message the bot sent.
    pub fn from_bot(text: impl Into<String>, reply_to: Option<MessageId>) -> Self {
        Self {
            from_bot: true,
            text: text.into(),
            reply_to,
        }
    }
}
