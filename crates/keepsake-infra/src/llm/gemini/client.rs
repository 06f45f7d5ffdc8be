//! GeminiProvider -- concrete [`GenerationProvider`] implementation for
//! the Gemini Generative Language API.
//!
//! Sends requests to `:generateContent` (non-streaming) and
//! `:streamGenerateContent?alt=sse` (streaming) with the API key in the
//! `x-goog-api-key` header.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never
//! logged or included in `Debug` output.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use secrecy::{ExposeSecret, SecretString};

use keepsake_core::llm::provider::GenerationProvider;
use keepsake_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, StopReason,
    StreamEvent, Usage,
};

use super::streaming::create_gemini_stream;
use super::types::{GeminiContent, GeminiRequest, GenerateContentResponse, GenerationConfig};

/// Gemini generation provider.
///
/// Implements [`GenerationProvider`] for the Generative Language API.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Gemini API key wrapped in SecretString
    /// * `model` - Model identifier (e.g. "gemini-1.5-flash")
    pub fn new(api_key: SecretString, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model,
        }
    }

    /// The default model for this provider.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Build the full API URL for a model method, e.g. "generateContent".
    fn url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{model}:{method}", self.base_url)
    }

    /// Convert a generic [`CompletionRequest`] into a [`GeminiRequest`].
    ///
    /// System messages in the transcript are folded into the system
    /// instruction; user/assistant messages map to "user"/"model" roles.
    fn to_gemini_request(request: &CompletionRequest) -> GeminiRequest {
        let mut system_parts: Vec<String> = Vec::new();
        if let Some(system) = &request.system {
            system_parts.push(system.clone());
        }

        let contents = request
            .messages
            .iter()
            .filter_map(|message: &Message| match message.role {
                MessageRole::System => {
                    system_parts.push(message.content.clone());
                    None
                }
                MessageRole::User => Some(GeminiContent::text(Some("user"), &message.content)),
                MessageRole::Assistant => Some(GeminiContent::text(Some("model"), &message.content)),
            })
            .collect();

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent::text(None, system_parts.join("\n\n")))
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }),
        }
    }

    /// Map a non-success HTTP status to an [`LlmError`].
    pub(super) fn error_for_status(status: reqwest::StatusCode, body: String) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::AuthenticationFailed,
            429 => LlmError::RateLimited {
                retry_after_ms: None,
            },
            503 => LlmError::Overloaded(body),
            400 => LlmError::InvalidRequest(body),
            _ => LlmError::Provider {
                message: format!("HTTP {status}: {body}"),
            },
        }
    }

    /// Map a Gemini finish reason string to a [`StopReason`].
    pub(super) fn map_finish_reason(reason: Option<&str>) -> StopReason {
        match reason {
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some("SAFETY") | Some("PROHIBITED_CONTENT") => StopReason::Safety,
            _ => StopReason::EndTurn,
        }
    }
}

// GeminiProvider intentionally does NOT derive Debug so the SecretString
// field can never leak through formatting.

impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = Self::to_gemini_request(request);
        let model = if request.model.is_empty() {
            &self.model
        } else {
            &request.model
        };
        let url = self.url(model, "generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
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
            return Err(Self::error_for_status(status, error_body));
        }

        let gemini_resp: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let usage = gemini_resp
            .usage_metadata
            .as_ref()
            .map(|meta| Usage {
                input_tokens: meta.prompt_token_count,
                output_tokens: meta.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: gemini_resp.first_candidate_text(),
            model: gemini_resp
                .model_version
                .clone()
                .unwrap_or_else(|| model.to_string()),
            stop_reason: Self::map_finish_reason(gemini_resp.finish_reason()),
            usage,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let body = Self::to_gemini_request(&request);
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };
        let url = format!("{}?alt=sse", self.url(&model, "streamGenerateContent"));

        create_gemini_stream(self.client.clone(), url, body, self.api_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_provider() -> GeminiProvider {
        GeminiProvider::new(
            SecretString::from("test-key-not-real"),
            "gemini-1.5-flash".to_string(),
        )
    }

    #[test]
    fn test_provider_name() {
        let provider = make_provider();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn test_url_building() {
        let provider = make_provider().with_base_url("http://localhost:8080".to_string());
        assert_eq!(
            provider.url("gemini-1.5-flash", "generateContent"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_to_gemini_request_maps_roles() {
        let request = CompletionRequest {
            model: "gemini-1.5-flash".to_string(),
            messages: vec![
                Message {
                    role: MessageRole::User,
                    content: "Hello".to_string(),
                },
                Message {
                    role: MessageRole::Assistant,
                    content: "Hi! Tell me about yourself.".to_string(),
                },
            ],
            system: Some("Be warm.".to_string()),
            max_tokens: 1024,
            temperature: Some(0.7),
            stream: false,
        };

        let gemini_req = GeminiProvider::to_gemini_request(&request);
        assert_eq!(gemini_req.contents.len(), 2);
        assert_eq!(gemini_req.contents[0].role.as_deref(), Some("user"));
        assert_eq!(gemini_req.contents[1].role.as_deref(), Some("model"));
        assert_eq!(
            gemini_req.system_instruction.unwrap().joined_text(),
            "Be warm."
        );
        let config = gemini_req.generation_config.unwrap();
        assert_eq!(config.max_output_tokens, 1024);
        assert_eq!(config.temperature, Some(0.7));
    }

    #[test]
    fn test_system_messages_fold_into_instruction() {
        let request = CompletionRequest {
            model: String::new(),
            messages: vec![
                Message {
                    role: MessageRole::System,
                    content: "You are a biographer.".to_string(),
                },
                Message {
                    role: MessageRole::User,
                    content: "Hello".to_string(),
                },
            ],
            system: None,
            max_tokens: 512,
            temperature: None,
            stream: false,
        };

        let gemini_req = GeminiProvider::to_gemini_request(&request);
        assert_eq!(gemini_req.contents.len(), 1);
        assert_eq!(
            gemini_req.system_instruction.unwrap().joined_text(),
            "You are a biographer."
        );
    }

    #[test]
    fn test_error_status_mapping() {
        use reqwest::StatusCode;

        assert!(matches!(
            GeminiProvider::error_for_status(StatusCode::UNAUTHORIZED, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            GeminiProvider::error_for_status(StatusCode::FORBIDDEN, String::new()),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            GeminiProvider::error_for_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            GeminiProvider::error_for_status(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            LlmError::Overloaded(_)
        ));
        assert!(matches!(
            GeminiProvider::error_for_status(StatusCode::BAD_REQUEST, String::new()),
            LlmError::InvalidRequest(_)
        ));
        assert!(matches!(
            GeminiProvider::error_for_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            LlmError::Provider { .. }
        ));
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(
            GeminiProvider::map_finish_reason(Some("STOP")),
            StopReason::EndTurn
        );
        assert_eq!(
            GeminiProvider::map_finish_reason(Some("MAX_TOKENS")),
            StopReason::MaxTokens
        );
        assert_eq!(
            GeminiProvider::map_finish_reason(Some("SAFETY")),
            StopReason::Safety
        );
        assert_eq!(GeminiProvider::map_finish_reason(None), StopReason::EndTurn);
    }
}
