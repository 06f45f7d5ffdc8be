//! Memory seed type.
//!
//! Seeds are topic suggestions injected by a third party (e.g. family)
//! to steer future interviews. The core reads active seeds for grounding;
//! marking a seed used is the caller's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A topic suggestion for future interviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySeed {
    pub id: Uuid,
    pub content: String,
    /// Set once the seed has been consumed by an interview.
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl MemorySeed {
    /// Create a new unused seed with a fresh UUIDv7 id.
    pub fn new(content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            content,
            used: false,
            created_at: Utc::now(),
        }
    }
}
