//! Memory fragment types for Keepsake.
//!
//! A fragment is a discrete unit of biographical information extracted
//! from conversation (or media analysis). Fragments start unverified and
//! must pass human review before they feed retrieval or the memoir.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Verification lifecycle of a memory fragment.
///
/// Machine-extracted fragments start `Pending`. Promotion to `Verified`
/// is monotonic: there is no automatic reversal. Rejection is a hard
/// delete, so it has no state of its own.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (state IN ('pending', 'verified'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    Pending,
    Verified,
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationState::Pending => write!(f, "pending"),
            VerificationState::Verified => write!(f, "verified"),
        }
    }
}

impl FromStr for VerificationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(VerificationState::Pending),
            "verified" => Ok(VerificationState::Verified),
            other => Err(format!("invalid verification state: '{other}'")),
        }
    }
}

impl Default for VerificationState {
    fn default() -> Self {
        VerificationState::Pending
    }
}

/// Coarse temporal classification of a conversation's subject matter.
///
/// Produced alongside fragment extraction; used downstream to style
/// era-appropriate imagery. Unknown labels fall back to `Modern`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Modern,
    Vintage,
    Sepia,
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Era::Modern => write!(f, "modern"),
            Era::Vintage => write!(f, "vintage"),
            Era::Sepia => write!(f, "sepia"),
        }
    }
}

impl FromStr for Era {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "modern" => Ok(Era::Modern),
            "vintage" => Ok(Era::Vintage),
            "sepia" => Ok(Era::Sepia),
            other => Err(format!("invalid era: '{other}'")),
        }
    }
}

impl Default for Era {
    fn default() -> Self {
        Era::Modern
    }
}

/// A discrete unit of biographical information.
///
/// Fragments are session-linked and carry an optional embedding of
/// `"{category}: {content}"` used for semantic retrieval. A fragment
/// without an embedding stays retrievable (the embedding is recomputed
/// on demand during retrieval).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFragment {
    pub id: Uuid,
    pub session_id: Uuid,
    /// Free-text label, e.g. "Childhood", "Career", "Visual Memory".
    pub category: String,
    /// The factual statement. Non-empty when stored.
    pub content: String,
    /// Provenance note, e.g. what prompted the disclosure.
    pub context: String,
    /// Embedding of `"{category}: {content}"`, absent until computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub state: VerificationState,
    /// Source image identifier for fragments produced by media analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MemoryFragment {
    /// Create a new pending fragment with a fresh UUIDv7 id.
    pub fn new_pending(
        session_id: Uuid,
        category: String,
        content: String,
        context: String,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id,
            category,
            content,
            context,
            embedding: None,
            state: VerificationState::Pending,
            media_ref: None,
            created_at: Utc::now(),
        }
    }

    /// The text the fragment's embedding is computed from.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.category, self.content)
    }
}
