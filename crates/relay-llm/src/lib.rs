//! Streaming chat-completion client.
//!
//! Builds an OpenAI-compatible streaming request from a resolved
//! conversation chain and exposes the response as a lazy, finite,
//! single-consumer stream of text deltas.

pub mod backend;
pub mod client;
pub mod protocol;
mod sse;

pub use backend::{CompletionBackend, Delta, DeltaStream, LlmError, Result};
pub use client::OpenAiClient;
