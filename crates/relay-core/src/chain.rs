//! Reply-chain reconstruction.
//!
//! A conversation is stored as a chain of reply pointers: each message record
//! optionally points at the message it replies to. Walking the chain backward
//! from a leaf and reversing the result recovers the chronological
//! user/assistant history for a completion request.

use thiserror::Error;

use crate::ids::{ChatId, MessageId, MessageKey};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum ChainError {
    /// A hop of the chain is missing from the store.
    #[error("history message {0} not found")]
    MissingLink(MessageKey),

    /// Two adjacent records do not alternate user/assistant.
    #[error("role does not match at {0}")]
    RoleMismatch(MessageKey),

    /// The chain root was produced by the bot, so the history cannot start
    /// with a user turn.
    #[error("conversation root is not a user message")]
    RootNotUser,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Walk the reply chain backward from `leaf_id` and return the message texts
/// in chronological order.
///
/// The leaf must be a user message and roles must alternate strictly along
/// the chain, so the result always has odd length: `user, assistant, …,
/// user`. Any violation is a hard validation failure; a broken chain is
/// surfaced to the caller, never silently repaired. No caching is done: every
/// call re-walks the full chain.
pub async fn resolve_chain(
    store: &dyn RecordStore,
    chat_id: ChatId,
    leaf_id: MessageId,
) -> Result<Vec<String>, ChainError> {
    let mut texts = Vec::new();
    let mut should_be_bot = false;
    let mut current = leaf_id;

    loop {
        let key = MessageKey::new(chat_id, current);
        let record = store
            .get(key)
            .await?
            .ok_or(ChainError::MissingLink(key))?;
        if record.from_bot != should_be_bot {
            return Err(ChainError::RoleMismatch(key));
        }
        texts.push(record.text);
        should_be_bot = !should_be_bot;
        match record.reply_to {
            Some(parent) => current = parent,
            None => break,
        }
    }

    if texts.len() % 2 != 1 {
        return Err(ChainError::RootNotUser);
    }
    texts.reverse();
    Ok(texts)
}
