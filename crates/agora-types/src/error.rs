use thiserror::Error;

/// Errors from repository operations (used by trait definitions in agora-core).
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

/// Errors from LLM provider operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("transport error: {0}")]
    Http(String),

    #[error("provider returned an empty completion")]
    Empty,

    /// Daily quota exhausted. There is no useful degraded mode once this
    /// fires; callers treat it as fatal rather than retryable.
    #[error("generation quota exceeded")]
    QuotaExceeded,
}

impl LlmError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::QuotaExceeded)
    }
}

/// Errors from the message intake pipeline.
///
/// The `Display` strings double as the generic wire error codes sent back
/// to the sender; none of them carry raw internal detail.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid message data")]
    Validation(String),

    #[error("unsupported message type: {0}")]
    UnsupportedKind(String),

    #[error("failed to save message")]
    Persistence(#[from] RepositoryError),
}

impl IntakeError {
    /// The offending message id to echo back, when the error knows one.
    /// Kept here so the wire mapping lives in one place.
    pub fn wire_code(&self) -> String {
        self.to_string()
    }
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
    fn test_quota_is_not_retryable() {
        assert!(!LlmError::QuotaExceeded.is_retryable());
        assert!(LlmError::Empty.is_retryable());
        assert!(
            LlmError::Provider {
                message: "503".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_intake_error_hides_internals() {
        let err = IntakeError::Validation("user typed secrets".to_string());
        // The detail is kept for logs; the wire code is generic.
        assert_eq!(err.wire_code(), "invalid message data");

        let err = IntakeError::UnsupportedKind("message:edit".to_string());
        // Protocol detail, safe to disclose.
        assert_eq!(err.wire_code(), "unsupported message type: message:edit");
    }
}
