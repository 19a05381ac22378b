//! Per-message orchestration: persist the inbound record, resolve the reply
//! chain, stream the completion through the throttled responder, persist the
//! outbound record.

use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;

use relay_core::{
    resolve_chain, ChainError, ChatId, MessageId, MessageKey, MessageRecord, RecordStore,
    StoreError, UserId,
};
use relay_llm::{CompletionBackend, Delta};
use relay_telegram::{ChatTransport, RetryPolicy, TransportError};

use crate::guards::{self, GuardVerdict};
use crate::locks::ChatLocks;
use crate::notices;
use crate::responder::ThrottledResponder;

/// Messages starting with this prefix open a fresh conversation root.
pub const NEW_THREAD_PREFIX: char = '$';

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// One inbound text message, already lifted out of the transport's update
/// envelope.
#[derive(Debug, Clone)]
pub struct InboundText {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub message_id: MessageId,
    pub text: String,
    /// Author and id of the message this one replies to, when present.
    pub reply_to: Option<(UserId, MessageId)>,
}

enum Classification {
    ReplyToBot { parent: MessageId },
    NewThread { text: String },
    Unrelated,
}

fn classify(inbound: &InboundText, bot_id: UserId) -> Classification {
    if let Some((author, parent)) = inbound.reply_to {
        if author == bot_id {
            return Classification::ReplyToBot { parent };
        }
    }
    if let Some(rest) = inbound.text.strip_prefix(NEW_THREAD_PREFIX) {
        return Classification::NewThread {
            text: rest.to_string(),
        };
    }
    Classification::Unrelated
}

pub struct Relay {
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) backend: Arc<dyn CompletionBackend>,
    pub(crate) transport: Arc<dyn ChatTransport>,
    pub(crate) bot_id: UserId,
    pub(crate) admin_id: UserId,
    pub(crate) retry: RetryPolicy,
    locks: ChatLocks,
}

impl Relay {
    pub fn new(
        store: Arc<dyn RecordStore>,
        backend: Arc<dyn CompletionBackend>,
        transport: Arc<dyn ChatTransport>,
        bot_id: UserId,
        admin_id: UserId,
    ) -> Self {
        Self {
            store,
            backend,
            transport,
            bot_id,
            admin_id,
            retry: RetryPolicy::default(),
            locks: ChatLocks::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Handle one plain-text message end to end. Chain and completion
    /// failures are reported to the user and terminate the turn; store and
    /// transport failures propagate to the dispatcher.
    pub async fn handle_text(&self, inbound: InboundText) -> Result<(), RelayError> {
        let chat_id = inbound.chat_id;
        log::info!(
            "new message: chat={}, sender={}, id={}, text={:?}",
            chat_id,
            inbound.sender_id,
            inbound.message_id,
            inbound.text
        );

        if let GuardVerdict::Deny { notice } =
            guards::whitelisted(self.store.as_ref(), chat_id, inbound.sender_id).await?
        {
            if let Some(notice) = notice {
                self.notify(chat_id, &notice).await?;
            }
            return Ok(());
        }

        let (text, parent) = match classify(&inbound, self.bot_id) {
            Classification::ReplyToBot { parent } => (inbound.text.clone(), Some(parent)),
            Classification::NewThread { text } => (text, None),
            Classification::Unrelated => {
                if guards::is_private(chat_id, inbound.sender_id) {
                    self.notify(chat_id, notices::USAGE_HINT).await?;
                }
                return Ok(());
            }
        };

        // Turns in the same chat are serialized from the inbound write to the
        // outbound write so their store writes cannot interleave.
        let lock = self.locks.lock_for(chat_id);
        let _guard = lock.lock().await;

        self.store
            .put(
                MessageKey::new(chat_id, inbound.message_id),
                &MessageRecord::from_user(text, parent),
            )
            .await?;

        let history = match resolve_chain(self.store.as_ref(), chat_id, inbound.message_id).await {
            Ok(history) => history,
            Err(ChainError::Store(error)) => return Err(error.into()),
            Err(error) => {
                log::error!("chain resolution failed in chat {chat_id}: {error}");
                self.notify(chat_id, notices::CHAIN_BROKEN).await?;
                return Ok(());
            }
        };

        let mut responder =
            ThrottledResponder::new(self.transport.as_ref(), chat_id, inbound.sender_id, self.retry);

        let mut stream = match self.backend.stream_chat(&history).await {
            Ok(stream) => stream,
            Err(error) => {
                log::error!("completion request failed: {error}");
                responder.abort(&notices::completion_failed(&error)).await?;
                return Ok(());
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(Delta::Text(delta)) => responder.push(&delta).await?,
                Ok(Delta::Truncated) => responder.push(notices::TRUNCATED).await?,
                Err(error) => {
                    log::error!("completion stream failed: {error}");
                    responder.abort(&notices::completion_failed(&error)).await?;
                    return Ok(());
                }
            }
        }

        let reply_text = responder.text().to_string();
        let reply_id = responder.finish().await?;

        self.store
            .put(
                MessageKey::new(chat_id, reply_id),
                &MessageRecord::from_bot(reply_text, Some(inbound.message_id)),
            )
            .await?;
        Ok(())
    }

    /// One-shot notice outside the streamed reply. No retry wrapper: these
    /// are best-effort single sends.
    pub(crate) async fn notify(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        self.transport.send_message(chat_id, text, true).await?;
        Ok(())
    }
}
