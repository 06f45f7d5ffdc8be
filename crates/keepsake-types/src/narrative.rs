//! Synthesized narrative type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single cohesive biography text produced by summarizing verified
/// fragments. Only the most recent instance is consumed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedNarrative {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl SynthesizedNarrative {
    /// Wrap generated narrative text with a fresh UUIDv7 id.
    pub fn new(content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            content,
            created_at: Utc::now(),
        }
    }
}
