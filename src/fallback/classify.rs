//! Turning one HTTP exchange into "success", "try the next model" or "stop".

use crate::ai::gemini::types::{ErrorEnvelope, GenerateContentResponse};
use crate::ai::TransportResponse;
use crate::models::ModelCandidate;
use std::collections::BTreeSet;

/// Finish reasons that mean the provider refused to answer this prompt.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT"];

/// Which non-2xx statuses move on to the next candidate.
///
/// Everything not listed aborts the fallback sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    skippable: BTreeSet<u16>,
}

impl StatusPolicy {
    pub fn new(skippable: impl IntoIterator<Item = u16>) -> Self {
        Self {
            skippable: skippable.into_iter().collect(),
        }
    }

    pub fn is_skippable(&self, status: u16) -> bool {
        self.skippable.contains(&status)
    }

    pub fn skippable_statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.skippable.iter().copied()
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new([403, 404, 500, 503])
    }
}

/// Result of one attempt against one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success {
        raw_text: String,
        candidate: ModelCandidate,
    },
    Skippable {
        status: Option<u16>,
        reason: String,
        candidate: ModelCandidate,
    },
    Fatal {
        status: Option<u16>,
        message: String,
    },
}

/// Classify a completed HTTP exchange.
pub fn classify(
    policy: &StatusPolicy,
    candidate: &ModelCandidate,
    response: &TransportResponse,
) -> AttemptOutcome {
    let status = response.status;

    if !response.is_success() {
        let detail = error_detail(&response.body);
        if policy.is_skippable(status) {
            return AttemptOutcome::Skippable {
                status: Some(status),
                reason: format!("HTTP {}: {}", status, detail),
                candidate: candidate.clone(),
            };
        }
        return AttemptOutcome::Fatal {
            status: Some(status),
            message: detail,
        };
    }

    let envelope: GenerateContentResponse = match serde_json::from_str(&response.body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return AttemptOutcome::Fatal {
                status: Some(status),
                message: format!("Unreadable response envelope from {}: {}", candidate.id, e),
            }
        }
    };

    if let Some(error) = &envelope.error {
        return AttemptOutcome::Fatal {
            status: error.code.or(Some(status)),
            message: error
                .message
                .clone()
                .unwrap_or_else(|| "Provider returned an error without a message".to_string()),
        };
    }

    match envelope.first_text() {
        Some(text) if !text.trim().is_empty() => AttemptOutcome::Success {
            raw_text: text.to_string(),
            candidate: candidate.clone(),
        },
        _ => {
            if let Some(reason) = envelope.block_reason() {
                return AttemptOutcome::Fatal {
                    status: None,
                    message: format!("Prompt blocked by the provider ({})", reason),
                };
            }
            match envelope.finish_reason() {
                Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason) => {
                    AttemptOutcome::Fatal {
                        status: None,
                        message: format!("Response blocked by the {} filter", reason),
                    }
                }
                reason => AttemptOutcome::Skippable {
                    status: Some(status),
                    reason: format!(
                        "Empty response (finish reason: {})",
                        reason.unwrap_or("none")
                    ),
                    candidate: candidate.clone(),
                },
            }
        }
    }
}

/// Best message available from an error body: `error.message` if the body is
/// the provider's error envelope, otherwise the trimmed body text.
fn error_detail(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = envelope.error.message {
            return message;
        }
        if let Some(status) = envelope.error.status {
            return status;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty body".to_string()
    } else {
        trimmed.chars().take(300).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate() -> ModelCandidate {
        ModelCandidate::new("model-a", "Model A")
    }

    fn run(status: u16, body: serde_json::Value) -> AttemptOutcome {
        classify(
            &StatusPolicy::default(),
            &candidate(),
            &TransportResponse::new(status, body.to_string()),
        )
    }

    #[test]
    fn test_default_skippable_statuses() {
        let policy = StatusPolicy::default();
        let statuses: Vec<u16> = policy.skippable_statuses().collect();
        assert_eq!(statuses, vec![403, 404, 500, 503]);
    }

    #[test]
    fn test_success_extracts_text() {
        let outcome = run(
            200,
            serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "{\"a\":1}" }] } }]
            }),
        );
        assert_eq!(
            outcome,
            AttemptOutcome::Success {
                raw_text: "{\"a\":1}".to_string(),
                candidate: candidate(),
            }
        );
    }

    #[test]
    fn test_skippable_statuses() {
        for status in [403, 404, 500, 503] {
            let outcome = run(status, serde_json::json!({ "error": { "message": "nope" } }));
            assert!(
                matches!(outcome, AttemptOutcome::Skippable { status: Some(s), .. } if s == status),
                "status {} should be skippable",
                status
            );
        }
    }

    #[test]
    fn test_quota_and_bad_request_are_fatal() {
        let outcome = run(
            429,
            serde_json::json!({ "error": { "code": 429, "message": "Resource has been exhausted" } }),
        );
        assert_eq!(
            outcome,
            AttemptOutcome::Fatal {
                status: Some(429),
                message: "Resource has been exhausted".to_string(),
            }
        );

        let outcome = classify(
            &StatusPolicy::default(),
            &candidate(),
            &TransportResponse::new(400, "bad things"),
        );
        assert_eq!(
            outcome,
            AttemptOutcome::Fatal {
                status: Some(400),
                message: "bad things".to_string(),
            }
        );
    }

    #[test]
    fn test_custom_policy_changes_classification() {
        let policy = StatusPolicy::new([429]);
        let outcome = classify(&policy, &candidate(), &TransportResponse::new(429, ""));
        assert!(matches!(outcome, AttemptOutcome::Skippable { .. }));

        let outcome = classify(&policy, &candidate(), &TransportResponse::new(404, ""));
        assert!(matches!(outcome, AttemptOutcome::Fatal { .. }));
    }

    #[test]
    fn test_embedded_error_on_success_status_is_fatal() {
        let outcome = run(200, serde_json::json!({ "error": { "message": "API key expired" } }));
        assert_eq!(
            outcome,
            AttemptOutcome::Fatal {
                status: Some(200),
                message: "API key expired".to_string(),
            }
        );
    }

    #[test]
    fn test_safety_block_is_fatal() {
        let outcome = run(200, serde_json::json!({ "candidates": [{ "finishReason": "SAFETY" }] }));
        match outcome {
            AttemptOutcome::Fatal { message, .. } => assert!(message.contains("SAFETY")),
            other => panic!("expected fatal, got {:?}", other),
        }

        let outcome = run(
            200,
            serde_json::json!({ "promptFeedback": { "blockReason": "OTHER" } }),
        );
        assert!(matches!(outcome, AttemptOutcome::Fatal { .. }));
    }

    #[test]
    fn test_empty_text_is_skippable() {
        let outcome = run(
            200,
            serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "  " }] }, "finishReason": "OTHER" }]
            }),
        );
        match outcome {
            AttemptOutcome::Skippable { reason, .. } => assert!(reason.contains("OTHER")),
            other => panic!("expected skippable, got {:?}", other),
        }

        let outcome = run(200, serde_json::json!({ "candidates": [] }));
        assert!(matches!(outcome, AttemptOutcome::Skippable { .. }));
    }

    #[test]
    fn test_unparseable_envelope_is_fatal() {
        let outcome = classify(
            &StatusPolicy::default(),
            &candidate(),
            &TransportResponse::new(200, "<html>oops</html>"),
        );
        assert!(matches!(outcome, AttemptOutcome::Fatal { status: Some(200), .. }));
    }

    #[test]
    fn test_error_detail_falls_back_to_body() {
        assert_eq!(error_detail(""), "empty body");
        assert_eq!(error_detail("  plain text "), "plain text");
        assert_eq!(
            error_detail(r#"{"error": {"status": "NOT_FOUND"}}"#),
            "NOT_FOUND"
        );
    }
}
