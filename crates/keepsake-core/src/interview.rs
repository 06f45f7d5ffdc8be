//! Interview turn orchestration.
//!
//! `InterviewService` composes the grounding context for a conversation
//! turn -- the top-K verified fragments relevant to the latest user
//! utterance, plus active memory seeds -- and sends the turn to the
//! generation provider. Grounding lookup failures degrade to an unground
//! prompt; they never fail the conversational turn.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;

use keepsake_types::fragment::VerificationState;
use keepsake_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, StreamEvent,
};
use keepsake_types::transcript::{TranscriptTurn, TurnRole};

use crate::llm::box_provider::BoxGenerationProvider;
use crate::memory::retrieval::{GroundingRetriever, DEFAULT_GROUNDING_LIMIT};
use crate::memory::store::{FragmentRepository, SeedRepository};

/// Interviewer persona for every conversation turn.
const INTERVIEWER_SYSTEM_PROMPT: &str = r#"You are Keepsake, an empathetic AI biographer.
Your goal is to interview the user to preserve their life stories.
Ask warm, open-ended questions.
Listen carefully to their answers.
Ask relevant follow-up questions based on what they just said to dig deeper.
Keep your responses concise and conversational (suitable for voice).
Do not produce long monologues."#;

/// Orchestrates grounded interview turns.
pub struct InterviewService<F, S>
where
    F: FragmentRepository,
    S: SeedRepository,
{
    provider: Arc<BoxGenerationProvider>,
    retriever: GroundingRetriever,
    fragment_repo: F,
    seed_repo: S,
    model: String,
}

impl<F, S> InterviewService<F, S>
where
    F: FragmentRepository,
    S: SeedRepository,
{
    pub fn new(
        provider: Arc<BoxGenerationProvider>,
        retriever: GroundingRetriever,
        fragment_repo: F,
        seed_repo: S,
        model: String,
    ) -> Self {
        Self {
            provider,
            retriever,
            fragment_repo,
            seed_repo,
            model,
        }
    }

    /// Answer a conversation turn, non-streaming.
    pub async fn respond(
        &self,
        turns: &[TranscriptTurn],
    ) -> Result<CompletionResponse, LlmError> {
        let request = self.build_request(turns, false).await;
        self.provider.generate(&request).await
    }

    /// Answer a conversation turn as a stream of events terminated by
    /// [`StreamEvent::Done`].
    pub async fn respond_stream(
        &self,
        turns: &[TranscriptTurn],
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let request = self.build_request(turns, true).await;
        self.provider.stream(request)
    }

    /// Build the completion request: transcript as messages, grounded
    /// system instruction.
    async fn build_request(&self, turns: &[TranscriptTurn], stream: bool) -> CompletionRequest {
        let latest_user_text = turns
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::User)
            .map(|turn| turn.text.as_str())
            .unwrap_or_default();

        let system = self.build_system_instruction(latest_user_text).await;

        let messages = turns
            .iter()
            .map(|turn| Message {
                role: match turn.role {
                    TurnRole::User => MessageRole::User,
                    TurnRole::Assistant => MessageRole::Assistant,
                },
                content: turn.text.clone(),
            })
            .collect();

        CompletionRequest {
            model: self.model.clone(),
            messages,
            system: Some(system),
            max_tokens: 1024,
            temperature: Some(0.7),
            stream,
        }
    }

    /// Compose the system instruction: persona, retrieved grounding, and
    /// active seeds. Store failures degrade to an unground prompt.
    async fn build_system_instruction(&self, latest_user_text: &str) -> String {
        let mut system = INTERVIEWER_SYSTEM_PROMPT.to_string();

        let verified = match self
            .fragment_repo
            .list_by_state(VerificationState::Verified)
            .await
        {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load verified fragments for grounding");
                Vec::new()
            }
        };

        let grounding = self
            .retriever
            .retrieve(latest_user_text, &verified, DEFAULT_GROUNDING_LIMIT)
            .await;

        if !grounding.is_empty() {
            system.push_str("\n\nWhat you already know about them:\n");
            for fragment in &grounding {
                system.push_str(&format!("- [{}] {}\n", fragment.category, fragment.content));
            }
        }

        let seeds = match self.seed_repo.list_active().await {
            Ok(seeds) => seeds,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load memory seeds for grounding");
                Vec::new()
            }
        };

        if !seeds.is_empty() {
            system.push_str("\nTopics their family hopes you will explore:\n");
            for seed in &seeds {
                system.push_str(&format!("- {}\n", seed.content));
            }
        }

        system
    }
}
