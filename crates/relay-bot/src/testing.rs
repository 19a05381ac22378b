//! Shared test doubles.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use relay_core::{ChatId, MessageId, UserId};
use relay_llm::{CompletionBackend, Delta, DeltaStream, LlmError};
use relay_telegram::{ChatTransport, TransportError};

#[derive(Debug, Clone)]
pub struct SentCall {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
    pub is_edit: bool,
}

/// Recording [`ChatTransport`] with injectable transient failures.
pub struct FakeTransport {
    calls: Mutex<Vec<SentCall>>,
    next_id: AtomicI64,
    fail_budget: AtomicU32,
    attempts: AtomicU32,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            fail_budget: AtomicU32::new(0),
            attempts: AtomicU32::new(0),
        }
    }

    /// Make the next `n` calls fail with a rate limit before recording.
    pub fn fail_next_transient(&self, n: u32) {
        self.fail_budget.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SentCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.text).collect()
    }

    /// Every attempted call, including ones that failed.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_budget.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_budget.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::RateLimited { retry_after: 1 });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        _disable_link_preview: bool,
    ) -> Result<MessageId, TransportError> {
        self.check_failure()?;
        let message_id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.calls.lock().unwrap().push(SentCall {
            chat_id,
            message_id,
            text: text.to_string(),
            is_edit: false,
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        _disable_link_preview: bool,
    ) -> Result<(), TransportError> {
        self.check_failure()?;
        self.calls.lock().unwrap().push(SentCall {
            chat_id,
            message_id,
            text: text.to_string(),
            is_edit: true,
        });
        Ok(())
    }
}

/// Canned [`CompletionBackend`] that records the histories it was given.
pub struct FakeBackend {
    script: Mutex<Vec<Result<Delta, LlmError>>>,
    histories: Mutex<Vec<Vec<String>>>,
    fail_call: bool,
}

impl FakeBackend {
    pub fn with_deltas(texts: &[&str]) -> Self {
        Self::with_items(
            texts
                .iter()
                .map(|text| Ok(Delta::Text(text.to_string())))
                .collect(),
        )
    }

    pub fn with_items(items: Vec<Result<Delta, LlmError>>) -> Self {
        Self {
            script: Mutex::new(items),
            histories: Mutex::new(Vec::new()),
            fail_call: false,
        }
    }

    /// Fail the call itself, as an exhausted-retries server error would.
    pub fn failing() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            histories: Mutex::new(Vec::new()),
            fail_call: true,
        }
    }

    pub fn histories(&self) -> Vec<Vec<String>> {
        self.histories.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    async fn stream_chat(&self, history: &[String]) -> Result<DeltaStream, LlmError> {
        self.histories.lock().unwrap().push(history.to_vec());
        if self.fail_call {
            return Err(LlmError::Api {
                status: 500,
                message: "upstream unavailable".to_string(),
            });
        }
        let items = std::mem::take(&mut *self.script.lock().unwrap());
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Senders/chats used across handler tests.
pub const BOT_ID: UserId = UserId(999);
pub const ADMIN_ID: UserId = UserId(1);
