//! Error types for language model calls

/// Errors reported by the sense classifier and card enricher.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model answered, but not with the JSON shape that was asked for.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed")]
    Transport(#[source] reqwest::Error),

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
}

impl ModelError {
    /// Whether the malformed-response retry layer should try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::MalformedResponse(_))
    }

    /// Whether no further call in this run can succeed.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            ModelError::QuotaExhausted(_) | ModelError::Unauthorized(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_malformed_is_retryable() {
        assert!(ModelError::MalformedResponse("x".into()).is_retryable());
        assert!(!ModelError::QuotaExhausted("x".into()).is_retryable());
        assert!(
            !ModelError::Api {
                status: 529,
                message: "overloaded".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_fatal_for_run() {
        assert!(ModelError::QuotaExhausted("x".into()).is_fatal_for_run());
        assert!(ModelError::Unauthorized("x".into()).is_fatal_for_run());
        assert!(!ModelError::MalformedResponse("x".into()).is_fatal_for_run());
        assert!(!ModelError::MissingApiKey("K".into()).is_fatal_for_run());
    }
}
