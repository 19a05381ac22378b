use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::ids::{ChatId, MessageKey};
use crate::record::MessageRecord;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage task join error: {0}")]
    Task(String),
}

/// Persistent mapping from message keys to records, plus the set of
/// authorized chats.
///
/// Writes are individually committed (last writer wins, no cross-key
/// transactions) and the implementation provides its own internal
/// serialization; callers take no external lock for store access.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Durable write of one message record. Keys are never overwritten in
    /// practice (records are append-only), but a repeated write replaces the
    /// previous value.
    async fn put(&self, key: MessageKey, record: &MessageRecord) -> StoreResult<()>;

    async fn get(&self, key: MessageKey) -> StoreResult<Option<MessageRecord>>;

    async fn is_authorized(&self, chat_id: ChatId) -> StoreResult<bool>;

    /// Idempotent: authorizing an already-authorized chat is a no-op.
    async fn authorize(&self, chat_id: ChatId) -> StoreResult<()>;

    /// Idempotent: revoking an unknown chat is a no-op.
    async fn revoke(&self, chat_id: ChatId) -> StoreResult<()>;

    async fn authorized_chats(&self) -> StoreResult<Vec<ChatId>>;
}

/// In-memory [`RecordStore`], used by tests and suitable for ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    records: HashMap<MessageKey, MessageRecord>,
    whitelist: HashSet<ChatId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn put(&self, key: MessageKey, record: &MessageRecord) -> StoreResult<()> {
        self.inner.write().await.records.insert(key, record.clone());
        Ok(())
    }

    async fn get(&self, key: MessageKey) -> StoreResult<Option<MessageRecord>> {
        Ok(self.inner.read().await.records.get(&key).cloned())
    }

    async fn is_authorized(&self, chat_id: ChatId) -> StoreResult<bool> {
        Ok(self.inner.read().await.whitelist.contains(&chat_id))
    }

    async fn authorize(&self, chat_id: ChatId) -> StoreResult<()> {
        self.inner.write().await.whitelist.insert(chat_id);
        Ok(())
    }

    async fn revoke(&self, chat_id: ChatId) -> StoreResult<()> {
        self.inner.write().await.whitelist.remove(&chat_id);
        Ok(())
    }

    async fn authorized_chats(&self) -> StoreResult<Vec<ChatId>> {
        let mut chats: Vec<ChatId> = self.inner.read().await.whitelist.iter().copied().collect();
        chats.sort_by_key(|chat| chat.0);
        Ok(chats)
    }
}
