//! Interview chat endpoints.
//!
//! POST /api/v1/chat        -- full-response turn
//! POST /api/v1/chat/stream -- SSE streaming turn
//!
//! Both endpoints hand the transcript (with the fresh assistant reply
//! appended) to the fragment extractor as a fire-and-forget background
//! task once the response is fully computed -- for the streaming variant,
//! after the stream completes. The caller never waits on extraction and
//! its outcome is only logged; a failed extraction is observable solely
//! as the absence of new fragments.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keepsake_types::llm::StreamEvent;
use keepsake_types::transcript::TranscriptTurn;

use crate::http::error::AppError;
use crate::state::{AppState, ConcreteExtractor};

/// Request body for the chat endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Existing session to continue; a new one is minted if absent.
    pub session_id: Option<Uuid>,
    /// Ordered conversation turns, oldest first.
    pub messages: Vec<ChatTurnBody>,
}

/// A single turn in the request body.
#[derive(Debug, Deserialize)]
pub struct ChatTurnBody {
    pub role: String,
    pub content: String,
}

/// Response body for the non-streaming chat endpoint.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub response: String,
}

/// Convert request turns to transcript turns.
///
/// "system" turns are dropped (the system instruction is composed
/// server-side); unknown roles are a validation error.
fn to_transcript(messages: &[ChatTurnBody]) -> Result<Vec<TranscriptTurn>, AppError> {
    let mut turns = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role.to_lowercase().as_str() {
            "user" => turns.push(TranscriptTurn::user(message.content.clone())),
            "assistant" | "model" => {
                turns.push(TranscriptTurn::assistant(message.content.clone()))
            }
            "system" => {}
            other => {
                return Err(AppError::Validation(format!("invalid message role: '{other}'")));
            }
        }
    }
    Ok(turns)
}

/// Spawn the fire-and-forget extraction task for a finished turn.
///
/// No result is observed by the caller; success and failure are logged
/// only. The task is not cancellable -- process shutdown may drop it,
/// which is acceptable because extraction is advisory.
fn spawn_extraction(
    extractor: Arc<ConcreteExtractor>,
    session_id: Uuid,
    turns: Vec<TranscriptTurn>,
) {
    tokio::spawn(async move {
        match extractor.extract_and_store(session_id, &turns).await {
            Ok(outcome) => {
                tracing::info!(
                    session_id = %session_id,
                    stored = outcome.stored,
                    era = %outcome.era,
                    "background extraction completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    error = %e,
                    "background extraction failed"
                );
            }
        }
    });
}

/// POST /api/v1/chat -- answer an interview turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let interview = state.interview.as_ref().ok_or(AppError::NotConfigured)?;

    let session_id = body.session_id.unwrap_or_else(Uuid::now_v7);
    let turns = to_transcript(&body.messages)?;
    if turns.is_empty() {
        return Err(AppError::Validation("messages must not be empty".to_string()));
    }

    let response = interview.respond(&turns).await?;

    // Hand the finished turn to the extractor in the background.
    if let Some(extractor) = &state.extractor {
        let mut transcript = turns;
        transcript.push(TranscriptTurn::assistant(response.content.clone()));
        spawn_extraction(Arc::clone(extractor), session_id, transcript);
    }

    Ok(Json(ChatResponse {
        session_id,
        response: response.content,
    }))
}

/// POST /api/v1/chat/stream -- SSE streaming turn.
///
/// SSE event types:
/// - `session` -- initial event with `{ "session_id": "..." }`
/// - `text_delta` -- incremental text: `{ "text": "..." }`
/// - `done` -- stream complete: `{}`
/// - `error` -- error occurred: `{ "message": "..." }`
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let interview = state.interview.clone().ok_or(AppError::NotConfigured)?;

    let session_id = body.session_id.unwrap_or_else(Uuid::now_v7);
    let turns = to_transcript(&body.messages)?;
    if turns.is_empty() {
        return Err(AppError::Validation("messages must not be empty".to_string()));
    }

    let extractor = state.extractor.clone();

    let sse_stream = async_stream::stream! {
        let session_json = serde_json::json!({ "session_id": session_id.to_string() });
        yield Ok::<_, Infallible>(Event::default().event("session").data(session_json.to_string()));

        let mut full_response = String::new();
        let mut had_error = false;

        let llm_stream = interview.respond_stream(&turns).await;
        let mut llm_stream = std::pin::pin!(llm_stream);

        while let Some(event_result) = llm_stream.next().await {
            match event_result {
                Ok(stream_event) => match stream_event {
                    StreamEvent::TextDelta { text } => {
                        let data = serde_json::json!({ "text": text });
                        yield Ok(Event::default().event("text_delta").data(data.to_string()));
                        full_response.push_str(&text);
                    }
                    StreamEvent::Done => {
                        break;
                    }
                    _ => {}
                },
                Err(e) => {
                    let data = serde_json::json!({ "message": e.to_string() });
                    yield Ok(Event::default().event("error").data(data.to_string()));
                    had_error = true;
                    break;
                }
            }
        }

        // Extraction launches only after the stream completed cleanly.
        if !had_error && !full_response.is_empty() {
            if let Some(extractor) = extractor {
                let mut transcript = turns;
                transcript.push(TranscriptTurn::assistant(full_response));
                spawn_extraction(extractor, session_id, transcript);
            }
        }

        yield Ok(Event::default().event("done").data("{}"));
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatTurnBody {
        ChatTurnBody {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_to_transcript_maps_roles() {
        let turns = to_transcript(&[
            turn("user", "My name is Lasse"),
            turn("assistant", "Tell me more"),
            turn("model", "Gemini-style role"),
        ])
        .unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].text, "My name is Lasse");
    }

    #[test]
    fn test_to_transcript_drops_system_turns() {
        let turns = to_transcript(&[
            turn("system", "You are a biographer."),
            turn("user", "Hello"),
        ])
        .unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "Hello");
    }

    #[test]
    fn test_to_transcript_rejects_unknown_role() {
        let result = to_transcript(&[turn("narrator", "Once upon a time")]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
