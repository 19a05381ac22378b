//! Access-control guards, evaluated before dispatching to a handler.
//!
//! Each guard returns allow/deny plus an optional user-facing notice, so the
//! caller composes them without knowing their policy.

use relay_core::{ChatId, RecordStore, StoreError, UserId};

use crate::notices;

#[derive(Debug, PartialEq, Eq)]
pub enum GuardVerdict {
    Allow,
    Deny { notice: Option<String> },
}

/// A chat is private when it is the sender's own 1:1 chat with the bot.
pub fn is_private(chat_id: ChatId, sender_id: UserId) -> bool {
    chat_id.0 == sender_id.0
}

pub fn admin(sender_id: UserId, admin_id: UserId) -> GuardVerdict {
    if sender_id == admin_id {
        GuardVerdict::Allow
    } else {
        GuardVerdict::Deny {
            notice: Some(notices::ADMIN_ONLY.to_string()),
        }
    }
}

pub fn private(chat_id: ChatId, sender_id: UserId) -> GuardVerdict {
    if is_private(chat_id, sender_id) {
        GuardVerdict::Allow
    } else {
        GuardVerdict::Deny {
            notice: Some(notices::PRIVATE_ONLY.to_string()),
        }
    }
}

/// Whitelist gate for conversation traffic. Denials are silent except in a
/// private chat, where the sender is told why nothing happens.
pub async fn whitelisted(
    store: &dyn RecordStore,
    chat_id: ChatId,
    sender_id: UserId,
) -> Result<GuardVerdict, StoreError> {
    if store.is_authorized(chat_id).await? {
        return Ok(GuardVerdict::Allow);
    }
    let notice = is_private(chat_id, sender_id).then(|| notices::NOT_WHITELISTED.to_string());
    Ok(GuardVerdict::Deny { notice })
}
