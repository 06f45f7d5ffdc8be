//! Narrative synthesis from verified fragments.
//!
//! Compiles the verified fragment corpus into a single cohesive
//! biography text via the generation provider and persists it. Only
//! verified fragments feed synthesis -- pending extractions never reach
//! the memoir. Unlike extraction, synthesis is a direct user action, so
//! generation failure propagates instead of being absorbed.

use std::sync::Arc;

use keepsake_types::error::NarrativeError;
use keepsake_types::fragment::VerificationState;
use keepsake_types::llm::{CompletionRequest, Message, MessageRole};
use keepsake_types::narrative::SynthesizedNarrative;

use crate::llm::box_provider::BoxGenerationProvider;
use crate::memory::store::{FragmentRepository, NarrativeRepository};

/// System prompt for the narrative synthesis call.
const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You are a ghostwriter assembling a person's memoir from verified memory fragments gathered across many interviews.

Write a single cohesive first-person narrative that weaves the fragments together chronologically where possible. Preserve concrete details (names, places, dates) exactly as given. Do not invent facts that are not in the fragments. Write warm, plain prose suitable for a printed keepsake."#;

/// Compiles verified fragments into a synthesized narrative.
pub struct NarrativeSynthesizer<F, N>
where
    F: FragmentRepository,
    N: NarrativeRepository,
{
    provider: Arc<BoxGenerationProvider>,
    fragment_repo: F,
    narrative_repo: N,
    model: String,
}

impl<F, N> NarrativeSynthesizer<F, N>
where
    F: FragmentRepository,
    N: NarrativeRepository,
{
    pub fn new(
        provider: Arc<BoxGenerationProvider>,
        fragment_repo: F,
        narrative_repo: N,
        model: String,
    ) -> Self {
        Self {
            provider,
            fragment_repo,
            narrative_repo,
            model,
        }
    }

    /// Synthesize a narrative from the verified corpus and persist it.
    ///
    /// Fails with [`NarrativeError::NoVerifiedFragments`] when nothing has
    /// passed the verification gate yet.
    #[tracing::instrument(name = "synthesize_narrative", skip(self))]
    pub async fn synthesize(&self) -> Result<SynthesizedNarrative, NarrativeError> {
        let verified = self
            .fragment_repo
            .list_by_state(VerificationState::Verified)
            .await?;

        if verified.is_empty() {
            return Err(NarrativeError::NoVerifiedFragments);
        }

        let mut source = String::from("Verified memory fragments:\n");
        for fragment in &verified {
            source.push_str(&format!("- [{}] {}", fragment.category, fragment.content));
            if !fragment.context.is_empty() {
                source.push_str(&format!(" ({})", fragment.context));
            }
            source.push('\n');
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: MessageRole::User,
                content: source,
            }],
            system: Some(SYNTHESIS_SYSTEM_PROMPT.to_string()),
            max_tokens: 8192,
            temperature: Some(0.7),
            stream: false,
        };

        let response = self.provider.generate(&request).await?;

        let narrative = SynthesizedNarrative::new(response.content);
        self.narrative_repo.insert(&narrative).await?;

        tracing::info!(
            narrative_id = %narrative.id,
            fragment_count = verified.len(),
            "narrative synthesized"
        );

        Ok(narrative)
    }

    /// The most recently synthesized narrative, if any.
    pub async fn latest(&self) -> Result<Option<SynthesizedNarrative>, NarrativeError> {
        Ok(self.narrative_repo.latest().await?)
    }
}
