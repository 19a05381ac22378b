//! Throttled delivery of a streamed reply.
//!
//! Chat messages cannot be edited token-by-token without tripping rate
//! limits, so the responder accumulates deltas and emits an edit at most
//! every few seconds, always finishing with one unconditional final edit of
//! the complete text.

use std::time::Duration;

use tokio::time::Instant;

use relay_core::{ChatId, MessageId, UserId};
use relay_telegram::{with_retry, ChatTransport, Result, RetryPolicy};

/// Minimum time between intermediate edits.
const EDIT_INTERVAL: Duration = Duration::from_secs(4);

/// Suffix shown while generation is still ongoing.
pub const IN_PROGRESS_MARKER: &str = "[generating…]";

pub struct ThrottledResponder<'a> {
    transport: &'a dyn ChatTransport,
    chat_id: ChatId,
    sender_id: UserId,
    retry: RetryPolicy,
    buffer: String,
    last_sent: Option<String>,
    last_flush: Instant,
    message_id: Option<MessageId>,
}

impl<'a> ThrottledResponder<'a> {
    pub fn new(
        transport: &'a dyn ChatTransport,
        chat_id: ChatId,
        sender_id: UserId,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            chat_id,
            sender_id,
            retry,
            buffer: String::new(),
            last_sent: None,
            last_flush: Instant::now(),
            message_id: None,
        }
    }

    /// The text accumulated so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Append a delta, emitting a marked intermediate edit when the throttle
    /// window has elapsed. An intermediate edit is skipped when the buffer is
    /// nothing more than the delta itself, or when it matches the last text
    /// already delivered.
    pub async fn push(&mut self, delta: &str) -> Result<()> {
        self.buffer.push_str(delta);
        if self.last_flush.elapsed() >= EDIT_INTERVAL
            && self.buffer != delta
            && self.last_sent.as_deref() != Some(self.buffer.as_str())
        {
            let marked = format!("{} {}", self.buffer, IN_PROGRESS_MARKER);
            self.deliver(&marked).await?;
            self.last_flush = Instant::now();
            self.last_sent = Some(self.buffer.clone());
        }
        Ok(())
    }

    /// Final delivery of the complete text with no marker. Unconditional:
    /// it happens regardless of the throttle timer.
    pub async fn finish(mut self) -> Result<MessageId> {
        let text = self.buffer.clone();
        self.deliver(&text).await
    }

    /// Replace whatever was streamed so far with an error notice.
    pub async fn abort(mut self, notice: &str) -> Result<()> {
        self.deliver(notice).await?;
        Ok(())
    }

    async fn deliver(&mut self, text: &str) -> Result<MessageId> {
        let transport = self.transport;
        let chat_id = self.chat_id;
        let is_edit = self.message_id.is_some();

        let message_id = match self.message_id {
            Some(message_id) => {
                with_retry(self.retry, || {
                    transport.edit_message(chat_id, message_id, text, true)
                })
                .await?;
                message_id
            }
            None => {
                let message_id =
                    with_retry(self.retry, || transport.send_message(chat_id, text, true)).await?;
                self.message_id = Some(message_id);
                message_id
            }
        };

        log::info!(
            "reply message: chat={}, sender={}, id={}, is_edit={}, text={:?}",
            chat_id,
            self.sender_id,
            message_id,
            is_edit,
            text
        );
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;

    const CHAT: ChatId = ChatId(42);
    const SENDER: UserId = UserId(7);

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 30,
            interval: Duration::from_secs(10),
        }
    }

    fn responder(transport: &FakeTransport) -> ThrottledResponder<'_> {
        ThrottledResponder::new(transport, CHAT, SENDER, fast_retry())
    }

    #[tokio::test(start_paused = true)]
    async fn short_stream_sends_exactly_one_message() {
        let transport = FakeTransport::new();
        let mut responder = responder(&transport);

        responder.push("Hel").await.unwrap();
        responder.push("lo").await.unwrap();
        responder.finish().await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].is_edit);
        assert_eq!(calls[0].text, "Hello");
    }

    #[tokio::test(start_paused = true)]
    async fn long_stream_emits_intermediate_edits_with_marker() {
        let transport = FakeTransport::new();
        let mut responder = responder(&transport);

        responder.push("a").await.unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;
        responder.push("b").await.unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;
        responder.push("c").await.unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;
        responder.push("d").await.unwrap();
        responder.finish().await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 4);
        // First delivery creates the message, the rest edit it in place.
        assert!(!calls[0].is_edit);
        assert!(calls[1..].iter().all(|call| call.is_edit));
        assert_eq!(calls[0].text, format!("ab {IN_PROGRESS_MARKER}"));
        assert_eq!(calls[1].text, format!("abc {IN_PROGRESS_MARKER}"));
        assert_eq!(calls[2].text, format!("abcd {IN_PROGRESS_MARKER}"));
        assert_eq!(calls[3].text, "abcd");
    }

    #[tokio::test(start_paused = true)]
    async fn first_delta_alone_is_never_flushed_early() {
        let transport = FakeTransport::new();
        let mut responder = responder(&transport);

        // Even with the window long expired, a buffer equal to the single
        // delta that produced it is not worth an intermediate edit.
        tokio::time::advance(Duration::from_secs(60)).await;
        responder.push("whole answer").await.unwrap();
        responder.finish().await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text, "whole answer");
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_buffer_is_not_resent() {
        let transport = FakeTransport::new();
        let mut responder = responder(&transport);

        responder.push("a").await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        responder.push("b").await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        // Empty deltas leave the buffer identical to the last sent text.
        responder.push("").await.unwrap();
        responder.push("").await.unwrap();
        responder.finish().await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].text, format!("ab {IN_PROGRESS_MARKER}"));
        assert_eq!(calls[1].text, "ab");
    }

    #[tokio::test(start_paused = true)]
    async fn final_send_happens_even_when_nothing_streamed() {
        let transport = FakeTransport::new();
        let responder = responder(&transport);

        responder.finish().await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text, "");
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_edit_is_retried_with_backoff() {
        let transport = FakeTransport::new();
        let mut responder = responder(&transport);

        responder.push("a").await.unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;
        responder.push("b").await.unwrap();
        assert_eq!(transport.calls().len(), 1);

        // Three rate-limited attempts, then the final edit goes through.
        transport.fail_next_transient(3);
        let before = transport.attempts();
        let start = tokio::time::Instant::now();
        responder.finish().await.unwrap();

        assert_eq!(transport.attempts() - before, 4);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].text, "ab");
        assert!(calls[1].is_edit);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_replaces_partial_text_with_notice() {
        let transport = FakeTransport::new();
        let mut responder = responder(&transport);

        responder.push("par").await.unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;
        responder.push("tial").await.unwrap();
        responder.abort("[!] something failed").await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].text, "[!] something failed");
        assert!(calls[1].is_edit);
    }
}
