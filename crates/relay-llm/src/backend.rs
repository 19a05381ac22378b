use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("completion api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl LlmError {
    /// Server-side failures are worth retrying; everything else is fatal for
    /// the current request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Api { status, .. } if *status >= 500)
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// One item of the completion response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    /// A verbatim text fragment. May be empty for fragments that carry only
    /// metadata.
    Text(String),
    /// The response was cut off by the model's output length limit. Always
    /// the last item when present.
    Truncated,
}

/// Lazy, finite, non-restartable sequence of deltas, consumed single-pass by
/// exactly one downstream consumer.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta>> + Send>>;

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Stream a completion for a resolved conversation chain.
    ///
    /// `history` is chronological, odd-length, alternating user/assistant
    /// turns starting and ending with the user.
    async fn stream_chat(&self, history: &[String]) -> Result<DeltaStream>;
}
