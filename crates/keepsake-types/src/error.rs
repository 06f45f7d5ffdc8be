use thiserror::Error;

/// Errors from repository operations (used by trait definitions in
/// keepsake-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from verification gate operations.
///
/// These surface directly to the user: verify/edit/reject are explicit
/// actions, not background best-effort work.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("fragment not found")]
    NotFound,

    #[error("fragment content must not be empty")]
    EmptyContent,

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Errors from embedding operations: the remote embedding service and the
/// byte-level codec for stored vectors.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding service error: {0}")]
    Service(String),

    #[error("embedding blob length {0} is not a multiple of 4")]
    MalformedBlob(usize),

    #[error("embedding batch returned {got} vectors for {expected} inputs")]
    BatchSizeMismatch { expected: usize, got: usize },
}

/// Errors from narrative synthesis.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("no verified fragments to synthesize from")]
    NoVerifiedFragments,

    #[error("generation error: {0}")]
    Generation(#[from] crate::llm::LlmError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_gate_error_display() {
        assert_eq!(GateError::NotFound.to_string(), "fragment not found");
        assert_eq!(
            GateError::EmptyContent.to_string(),
            "fragment content must not be empty"
        );
    }

    #[test]
    fn test_gate_error_from_repository() {
        let err: GateError = RepositoryError::NotFound.into();
        assert!(matches!(err, GateError::Storage(RepositoryError::NotFound)));
    }

    #[test]
    fn test_embedding_error_display() {
        let err = EmbeddingError::MalformedBlob(7);
        assert_eq!(
            err.to_string(),
            "embedding blob length 7 is not a multiple of 4"
        );
    }
}
