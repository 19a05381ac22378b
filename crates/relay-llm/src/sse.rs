//! SSE -> [`DeltaStream`] adapter.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Response;

use crate::backend::{Delta, DeltaStream, LlmError, Result};

/// Convert an SSE HTTP [`Response`] into a [`DeltaStream`].
///
/// `handler` receives each event's data payload and can either:
/// - return `Ok(Some(delta))` to emit a delta
/// - return `Ok(None)` to skip an event
/// - return `Err(_)` to emit an error (handler errors pass through untouched
///   so protocol violations keep their class)
pub fn delta_stream_from_sse<H>(response: Response, mut handler: H) -> DeltaStream
where
    H: FnMut(&str) -> Result<Option<Delta>> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(move |event| {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            handler(event.data.as_str())
        })
        .filter_map(|result| async move {
            match result {
                Ok(Some(delta)) => Some(Ok(delta)),
                Ok(None) => None,
                Err(err) => Some(Err(err)),
            }
        });

    Box::pin(stream)
}
