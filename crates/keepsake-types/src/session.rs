//! Interview session type.
//!
//! Sessions group the fragments extracted from one conversation and carry
//! the era classification of its subject matter. Rows are created lazily
//! the first time a fragment is extracted for the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fragment::Era;

/// An interview conversation, as known to the fragment store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub era: Era,
    pub created_at: DateTime<Utc>,
}
