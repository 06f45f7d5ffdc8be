//! Repository trait definitions for the fragment store.
//!
//! Provides CRUD operations for memory fragments, interview sessions,
//! memory seeds, and synthesized narratives. All traits use native async
//! fn in traits (RPITIT, Rust 2024 edition); implementations live in
//! keepsake-infra (e.g. `SqliteFragmentRepository`).
//!
//! Every query returns full domain records; callers select the fields
//! they need. All mutations are atomic at the granularity of a single
//! row -- no cross-fragment transactions are required or assumed.

use keepsake_types::error::RepositoryError;
use keepsake_types::fragment::{Era, MemoryFragment, VerificationState};
use keepsake_types::narrative::SynthesizedNarrative;
use keepsake_types::seed::MemorySeed;
use keepsake_types::session::InterviewSession;
use uuid::Uuid;

/// Repository trait for memory fragment persistence.
pub trait FragmentRepository: Send + Sync {
    /// Insert a new fragment.
    fn insert(
        &self,
        fragment: &MemoryFragment,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a fragment by id.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<MemoryFragment>, RepositoryError>> + Send;

    /// All fragments in the store's natural order (created_at, then id,
    /// ascending -- i.e. insertion order for UUIDv7 ids).
    fn list_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<MemoryFragment>, RepositoryError>> + Send;

    /// Fragments in a given verification state, natural order.
    fn list_by_state(
        &self,
        state: VerificationState,
    ) -> impl std::future::Future<Output = Result<Vec<MemoryFragment>, RepositoryError>> + Send;

    /// Update a fragment's content and optionally its category, leaving
    /// the verification state untouched.
    fn update_content(
        &self,
        id: &Uuid,
        content: &str,
        category: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Set a fragment's verification state.
    fn set_state(
        &self,
        id: &Uuid,
        state: VerificationState,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Attach a freshly computed embedding to a fragment.
    fn set_embedding(
        &self,
        id: &Uuid,
        embedding: &[f32],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Hard-delete a fragment. No tombstone remains.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

/// Repository trait for interview session rows.
pub trait SessionRepository: Send + Sync {
    /// Create the session row if it does not exist yet.
    fn ensure_session(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Record the era classification for a session.
    fn set_era(
        &self,
        id: &Uuid,
        era: Era,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a session by id.
    fn get_session(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<InterviewSession>, RepositoryError>> + Send;
}

/// Repository trait for memory seeds.
pub trait SeedRepository: Send + Sync {
    /// Insert a new seed.
    fn insert(
        &self,
        seed: &MemorySeed,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Seeds not yet consumed, in insertion order.
    fn list_active(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<MemorySeed>, RepositoryError>> + Send;

    /// All seeds, in insertion order.
    fn list_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<MemorySeed>, RepositoryError>> + Send;

    /// Flag a seed as consumed.
    fn mark_used(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

/// Repository trait for synthesized narratives.
pub trait NarrativeRepository: Send + Sync {
    /// Insert a new narrative.
    fn insert(
        &self,
        narrative: &SynthesizedNarrative,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The most recently created narrative, if any.
    fn latest(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<SynthesizedNarrative>, RepositoryError>> + Send;
}
