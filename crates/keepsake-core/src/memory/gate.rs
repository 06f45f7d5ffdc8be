//! Verification gate for machine-extracted fragments.
//!
//! Fragments enter the store as `pending` and only become eligible for
//! retrieval grounding and narrative compilation once a human promotes
//! them to `verified`. Rejection is a hard delete. These operations are
//! explicit user actions, so their failures surface to the caller --
//! unlike extraction, nothing here is absorbed.

use uuid::Uuid;

use keepsake_types::error::{GateError, RepositoryError};
use keepsake_types::fragment::{MemoryFragment, VerificationState};

use crate::memory::store::FragmentRepository;

/// Manages the pending-to-verified lifecycle of memory fragments.
pub struct VerificationGate<R: FragmentRepository> {
    repo: R,
}

impl<R: FragmentRepository> VerificationGate<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying fragment repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Fragments awaiting review, in store order.
    pub async fn list_pending(&self) -> Result<Vec<MemoryFragment>, GateError> {
        Ok(self.repo.list_by_state(VerificationState::Pending).await?)
    }

    /// Fragments for listing/export. Defaults to verified only; the
    /// include-all mode is for administrative listing and must be
    /// requested explicitly.
    pub async fn list_fragments(&self, include_all: bool) -> Result<Vec<MemoryFragment>, GateError> {
        if include_all {
            Ok(self.repo.list_all().await?)
        } else {
            Ok(self.repo.list_by_state(VerificationState::Verified).await?)
        }
    }

    /// Promote a fragment to `verified`.
    ///
    /// Idempotent: verifying an already-verified fragment is a no-op, not
    /// an error. Fails with [`GateError::NotFound`] for an unknown id.
    pub async fn verify(&self, id: &Uuid) -> Result<MemoryFragment, GateError> {
        let mut fragment = self.repo.get(id).await?.ok_or(GateError::NotFound)?;

        if fragment.state == VerificationState::Verified {
            return Ok(fragment);
        }

        self.repo.set_state(id, VerificationState::Verified).await?;
        fragment.state = VerificationState::Verified;

        tracing::info!(fragment_id = %id, "fragment verified");
        Ok(fragment)
    }

    /// Edit a fragment's content (required, non-empty) and optionally its
    /// category, without changing its verification state.
    pub async fn edit(
        &self,
        id: &Uuid,
        content: &str,
        category: Option<&str>,
    ) -> Result<MemoryFragment, GateError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(GateError::EmptyContent);
        }

        let mut fragment = self.repo.get(id).await?.ok_or(GateError::NotFound)?;

        self.repo.update_content(id, content, category).await?;
        fragment.content = content.to_string();
        if let Some(category) = category {
            fragment.category = category.to_string();
        }

        tracing::info!(fragment_id = %id, "fragment edited");
        Ok(fragment)
    }

    /// Discard a fragment entirely. Hard delete -- no tombstone.
    pub async fn reject(&self, id: &Uuid) -> Result<(), GateError> {
        self.repo.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => GateError::NotFound,
            other => GateError::Storage(other),
        })?;

        tracing::info!(fragment_id = %id, "fragment rejected");
        Ok(())
    }
}
