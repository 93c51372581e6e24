//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror. The
//! fallback layer distinguishes "every model was unavailable" from "the
//! request itself was rejected" so callers can word their messages
//! differently.

use thiserror::Error;

/// HTTP status the provider uses for exhausted quota.
pub const QUOTA_EXCEEDED_STATUS: u16 = 429;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-retryable rejection: quota, bad request, provider error, safety block.
    #[error("Request rejected{}: {message}", status_suffix(.status))]
    FatalRequest {
        status: Option<u16>,
        message: String,
    },

    /// Every candidate in the preference list failed with a skippable outcome.
    #[error("All model candidates failed, last error: {0}")]
    FallbackExhausted(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    pub fn fatal(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::FatalRequest {
            status,
            message: message.into(),
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            Error::FatalRequest {
                status: Some(QUOTA_EXCEEDED_STATUS),
                ..
            }
        )
    }

    /// Short text suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Error::FallbackExhausted(_) => {
                "The generation service is temporarily degraded. Please try again shortly."
                    .to_string()
            }
            Error::FatalRequest { .. } if self.is_quota_exceeded() => {
                "The API quota is exhausted. Wait a while before trying again.".to_string()
            }
            Error::FatalRequest { message, .. } => {
                format!("The request was rejected: {}", message)
            }
            Error::MalformedResponse(_) => {
                "The model returned an unreadable answer. Please regenerate.".to_string()
            }
            Error::DeadlineExceeded => "The request took too long and was stopped.".to_string(),
            Error::Cancelled => "The request was cancelled.".to_string(),
            other => other.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (status {})", s))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_display_includes_status() {
        let err = Error::fatal(Some(400), "bad request");
        assert_eq!(err.to_string(), "Request rejected (status 400): bad request");

        let err = Error::fatal(None, "blocked");
        assert_eq!(err.to_string(), "Request rejected: blocked");
    }

    #[test]
    fn test_quota_detection() {
        assert!(Error::fatal(Some(429), "quota").is_quota_exceeded());
        assert!(!Error::fatal(Some(400), "bad").is_quota_exceeded());
        assert!(!Error::FallbackExhausted("x".to_string()).is_quota_exceeded());
    }

    #[test]
    fn test_user_messages_differ_by_kind() {
        let exhausted = Error::FallbackExhausted("HTTP 503".to_string()).user_message();
        let fatal = Error::fatal(Some(400), "invalid argument").user_message();
        let malformed = Error::MalformedResponse("eof".to_string()).user_message();

        assert!(exhausted.contains("try again"));
        assert!(fatal.contains("invalid argument"));
        assert!(malformed.contains("regenerate"));
        assert!(Error::fatal(Some(429), "quota")
            .user_message()
            .contains("quota"));
    }
}
