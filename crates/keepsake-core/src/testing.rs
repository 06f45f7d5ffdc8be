//! In-memory stubs shared by the crate's unit tests.
//!
//! These implement the repository, provider, and embedder traits over
//! plain `Mutex`-guarded collections so pipeline behavior can be tested
//! without a database or network.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;

use futures_util::Stream;
use uuid::Uuid;

use keepsake_types::error::{EmbeddingError, RepositoryError};
use keepsake_types::fragment::{Era, MemoryFragment, VerificationState};
use keepsake_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};
use keepsake_types::narrative::SynthesizedNarrative;
use keepsake_types::seed::MemorySeed;
use keepsake_types::session::InterviewSession;

use crate::embedding::embedder::Embedder;
use crate::llm::provider::GenerationProvider;
use crate::memory::store::{
    FragmentRepository, NarrativeRepository, SeedRepository, SessionRepository,
};

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Provider that always answers with a fixed string.
pub struct StaticProvider {
    reply: String,
}

impl StaticProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl GenerationProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }

    fn stream(
        &self,
        _request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let events = vec![
            Ok(StreamEvent::Connected),
            Ok(StreamEvent::TextDelta {
                text: self.reply.clone(),
            }),
            Ok(StreamEvent::MessageDelta {
                stop_reason: StopReason::EndTurn,
            }),
            Ok(StreamEvent::Done),
        ];
        Box::pin(futures_util::stream::iter(events))
    }
}

/// Provider whose every call fails, for unavailability paths.
pub struct FailingProvider;

impl GenerationProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(
        &self,
        _request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::Provider {
            message: "stub failure".to_string(),
        })
    }

    fn stream(
        &self,
        _request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        Box::pin(futures_util::stream::iter(vec![Err(LlmError::Provider {
            message: "stub failure".to_string(),
        })]))
    }
}

// ---------------------------------------------------------------------------
// Embedders
// ---------------------------------------------------------------------------

/// Embedder that returns the same vector for every input.
pub struct ConstantEmbedder {
    vector: Vec<f32>,
}

impl ConstantEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

impl Embedder for ConstantEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }

    fn model_name(&self) -> &str {
        "constant-test-embedder"
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Embedder with a fixed text-to-vector mapping; unknown texts get the
/// fallback vector.
pub struct KeyedEmbedder {
    map: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
}

impl KeyedEmbedder {
    pub fn new(entries: Vec<(&str, Vec<f32>)>, fallback: Vec<f32>) -> Self {
        Self {
            map: entries
                .into_iter()
                .map(|(text, vector)| (text.to_string(), vector))
                .collect(),
            fallback,
        }
    }
}

impl Embedder for KeyedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| self.map.get(text).cloned().unwrap_or_else(|| self.fallback.clone()))
            .collect())
    }

    fn model_name(&self) -> &str {
        "keyed-test-embedder"
    }

    fn dimension(&self) -> usize {
        self.fallback.len()
    }
}

/// Embedder whose every call fails, for unavailability paths.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Service("stub failure".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing-test-embedder"
    }

    fn dimension(&self) -> usize {
        0
    }
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// Fragment store over a `Mutex<Vec>`; insertion order is natural order.
#[derive(Default)]
pub struct InMemoryFragments {
    inner: Mutex<Vec<MemoryFragment>>,
}

impl InMemoryFragments {
    pub fn all(&self) -> Vec<MemoryFragment> {
        self.inner.lock().unwrap().clone()
    }

    pub fn push(&self, fragment: MemoryFragment) {
        self.inner.lock().unwrap().push(fragment);
    }
}

impl FragmentRepository for InMemoryFragments {
    async fn insert(&self, fragment: &MemoryFragment) -> Result<(), RepositoryError> {
        self.inner.lock().unwrap().push(fragment.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<MemoryFragment>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == *id)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<MemoryFragment>, RepositoryError> {
        Ok(self.inner.lock().unwrap().clone())
    }

    async fn list_by_state(
        &self,
        state: VerificationState,
    ) -> Result<Vec<MemoryFragment>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.state == state)
            .cloned()
            .collect())
    }

    async fn update_content(
        &self,
        id: &Uuid,
        content: &str,
        category: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().unwrap();
        let fragment = guard
            .iter_mut()
            .find(|f| f.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        fragment.content = content.to_string();
        if let Some(category) = category {
            fragment.category = category.to_string();
        }
        Ok(())
    }

    async fn set_state(
        &self,
        id: &Uuid,
        state: VerificationState,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().unwrap();
        let fragment = guard
            .iter_mut()
            .find(|f| f.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        fragment.state = state;
        Ok(())
    }

    async fn set_embedding(&self, id: &Uuid, embedding: &[f32]) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().unwrap();
        let fragment = guard
            .iter_mut()
            .find(|f| f.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        fragment.embedding = Some(embedding.to_vec());
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().unwrap();
        let before = guard.len();
        guard.retain(|f| f.id != *id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Session store over a `Mutex<HashMap>`.
#[derive(Default)]
pub struct InMemorySessions {
    inner: Mutex<HashMap<Uuid, InterviewSession>>,
}

impl InMemorySessions {
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn era_of(&self, id: &Uuid) -> Option<Era> {
        self.inner.lock().unwrap().get(id).map(|s| s.era)
    }
}

impl SessionRepository for InMemorySessions {
    async fn ensure_session(&self, id: &Uuid) -> Result<(), RepositoryError> {
        self.inner
            .lock()
            .unwrap()
            .entry(*id)
            .or_insert_with(|| InterviewSession {
                id: *id,
                era: Era::default(),
                created_at: chrono::Utc::now(),
            });
        Ok(())
    }

    async fn set_era(&self, id: &Uuid, era: Era) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().unwrap();
        let session = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        session.era = era;
        Ok(())
    }

    async fn get_session(&self, id: &Uuid) -> Result<Option<InterviewSession>, RepositoryError> {
        Ok(self.inner.lock().unwrap().get(id).cloned())
    }
}

/// Seed store over a `Mutex<Vec>`.
#[derive(Default)]
pub struct InMemorySeeds {
    inner: Mutex<Vec<MemorySeed>>,
}

impl InMemorySeeds {
    pub fn push(&self, seed: MemorySeed) {
        self.inner.lock().unwrap().push(seed);
    }
}

impl SeedRepository for InMemorySeeds {
    async fn insert(&self, seed: &MemorySeed) -> Result<(), RepositoryError> {
        self.inner.lock().unwrap().push(seed.clone());
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<MemorySeed>, RepositoryError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !s.used)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<MemorySeed>, RepositoryError> {
        Ok(self.inner.lock().unwrap().clone())
    }

    async fn mark_used(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().unwrap();
        let seed = guard
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        seed.used = true;
        Ok(())
    }
}

/// Narrative store over a `Mutex<Vec>`.
#[derive(Default)]
pub struct InMemoryNarratives {
    inner: Mutex<Vec<SynthesizedNarrative>>,
}

impl InMemoryNarratives {
    pub fn all(&self) -> Vec<SynthesizedNarrative> {
        self.inner.lock().unwrap().clone()
    }
}

impl NarrativeRepository for InMemoryNarratives {
    async fn insert(&self, narrative: &SynthesizedNarrative) -> Result<(), RepositoryError> {
        self.inner.lock().unwrap().push(narrative.clone());
        Ok(())
    }

    async fn latest(&self) -> Result<Option<SynthesizedNarrative>, RepositoryError> {
        Ok(self.inner.lock().unwrap().last().cloned())
    }
}
