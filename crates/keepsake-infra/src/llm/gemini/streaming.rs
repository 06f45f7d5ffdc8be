//! SSE stream adapter for `streamGenerateContent?alt=sse`.
//!
//! Gemini streams a sequence of `GenerateContentResponse` chunks as SSE
//! `data:` events; the stream simply ends after the final chunk (there is
//! no end sentinel on the wire). This adapter maps the chunks to the
//! provider-agnostic [`StreamEvent`] enum and appends an explicit
//! [`StreamEvent::Done`] so callers can distinguish completion from a
//! dropped connection.
//!
//! Event order: `Connected`, then `TextDelta` per non-empty chunk,
//! `MessageDelta` when a finish reason arrives, `Usage` from the last
//! chunk carrying usage metadata, then `Done`.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};

use keepsake_types::llm::{LlmError, StreamEvent, Usage};

use super::client::GeminiProvider;
use super::types::{GeminiRequest, GenerateContentResponse};

/// Create a streaming SSE connection to `streamGenerateContent`.
///
/// Returns a `Stream` of [`StreamEvent`]s terminated by `Done`.
pub fn create_gemini_stream(
    client: reqwest::Client,
    url: String,
    body: GeminiRequest,
    api_key: SecretString,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            Err::<StreamEvent, LlmError>(GeminiProvider::error_for_status(status, error_body))?;
            return;
        }

        yield StreamEvent::Connected;

        let mut usage: Option<Usage> = None;
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;

            let chunk: GenerateContentResponse = serde_json::from_str(&event.data)
                .map_err(|e| LlmError::Deserialization(format!("bad stream chunk: {e}")))?;

            let text = chunk.first_candidate_text();
            if !text.is_empty() {
                yield StreamEvent::TextDelta { text };
            }

            if let Some(reason) = chunk.finish_reason() {
                yield StreamEvent::MessageDelta {
                    stop_reason: GeminiProvider::map_finish_reason(Some(reason)),
                };
            }

            if let Some(meta) = chunk.usage_metadata {
                usage = Some(Usage {
                    input_tokens: meta.prompt_token_count,
                    output_tokens: meta.candidates_token_count,
                });
            }
        }

        if let Some(usage) = usage {
            yield StreamEvent::Usage(usage);
        }

        yield StreamEvent::Done;
    })
}
