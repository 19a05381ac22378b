//! OpenAI-compatible request serialization and stream-chunk parsing.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::backend::{Delta, LlmError, Result};

/// Default system instruction. `{current_time}` is substituted per request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant relayed over a chat platform. \
     Answer as concisely as possible. Current time: {current_time}";

/// Substitute the time placeholder. The time is recomputed for every request
/// so long-lived conversations keep an accurate clock.
pub fn render_system_prompt(template: &str, now: DateTime<Utc>) -> String {
    template.replace("{current_time}", &now.format("%Y-%m-%d %H:%M").to_string())
}

/// Build the streaming chat request body: the system instruction followed by
/// alternating user/assistant turns matching the chain order (first = user).
pub fn build_request_body(model: &str, system_prompt: &str, history: &[String]) -> Value {
    let mut messages = vec![json!({"role": "system", "content": system_prompt})];
    let roles = ["user", "assistant"];
    for (index, text) in history.iter().enumerate() {
        messages.push(json!({"role": roles[index % 2], "content": text}));
    }

    json!({
        "model": model,
        "messages": messages,
        "stream": true,
    })
}

// --- streaming chunk parsing ---

#[derive(Debug, Deserialize)]
pub struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: DeltaPayload,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DeltaPayload {
    role: Option<String>,
    content: Option<String>,
}

/// Parse one SSE `data:` payload.
///
/// - `"[DONE]"` or a non-`length` terminal reason -> `Ok(None)` (skipped; the
///   stream then ends with the connection)
/// - terminal reason `"length"` -> a final [`Delta::Truncated`] sentinel
/// - a role other than `assistant` -> [`LlmError::Protocol`]
/// - text content -> yielded verbatim; metadata-only fragments yield empty
///   text
pub fn parse_stream_data(data: &str) -> Result<Option<Delta>> {
    if data.trim() == "[DONE]" {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(data)?;
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(Some(Delta::Text(String::new())));
    };

    if let Some(reason) = choice.finish_reason {
        return Ok(match reason.as_str() {
            "length" => Some(Delta::Truncated),
            _ => None,
        });
    }

    if let Some(role) = &choice.delta.role {
        if role != "assistant" {
            return Err(LlmError::Protocol(format!(
                "unexpected role in stream delta: {role}"
            )));
        }
    }

    Ok(Some(Delta::Text(choice.delta.content.unwrap_or_default())))
}
