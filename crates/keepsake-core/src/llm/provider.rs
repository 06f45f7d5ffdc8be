//! GenerationProvider trait definition.
//!
//! This is the core abstraction over the text generation capability.
//! Uses RPITIT for `generate`, and `Pin<Box<dyn Stream>>` for `stream`
//! (streams need to be object-safe for the BoxGenerationProvider wrapper).

use std::pin::Pin;

use futures_util::Stream;

use keepsake_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

/// Trait for generation provider backends (Gemini, etc.).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition) for
/// `generate`. The `stream` method returns a boxed stream because streams
/// need to be object-safe for `BoxGenerationProvider`.
///
/// Implementations live in keepsake-infra (e.g. `GeminiProvider`).
pub trait GenerationProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn generate(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;

    /// Send a streaming completion request. Returns a stream of events
    /// terminated by an explicit [`StreamEvent::Done`].
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
