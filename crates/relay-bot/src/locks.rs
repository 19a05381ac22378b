use std::sync::Arc;

use dashmap::DashMap;
use relay_core::ChatId;
use tokio::sync::Mutex;

/// Per-conversation locks. Turns in the same chat must not interleave their
/// store writes, while distinct chats proceed concurrently.
#[derive(Clone, Default)]
pub struct ChatLocks {
    inner: Arc<DashMap<ChatId, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub fn lock_for(&self, chat_id: ChatId) -> Arc<Mutex<()>> {
        self.inner.entry(chat_id).or_default().clone()
    }
}
