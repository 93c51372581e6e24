//! Model-fallback request execution
//!
//! Tries each candidate of a preference list in order and returns the first
//! usable response. Statuses that point at one model being unavailable move
//! on to the next candidate; anything that would fail the same way for every
//! model aborts the whole sequence.

pub mod backoff;
pub mod classify;

pub use backoff::QuotaBackoff;
pub use classify::{classify, AttemptOutcome, StatusPolicy};

use crate::ai::gemini::GenerateContentRequest;
use crate::ai::GenerationTransport;
use crate::context::RequestContext;
use crate::models::{GenerationRequest, ModelCandidate};
use crate::rate_limit::RateLimiter;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::RetryIf;
use tracing::{debug, error, info, warn};

const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw text of the first successful attempt and the candidate that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub raw_text: String,
    pub candidate: ModelCandidate,
}

pub struct FallbackExecutor {
    transport: Arc<dyn GenerationTransport>,
    policy: StatusPolicy,
    attempt_timeout: Duration,
    quota_backoff: QuotaBackoff,
    limiter: Option<Arc<RateLimiter>>,
}

impl FallbackExecutor {
    pub fn new(transport: Arc<dyn GenerationTransport>) -> Self {
        Self {
            transport,
            policy: StatusPolicy::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            quota_backoff: QuotaBackoff::none(),
            limiter: None,
        }
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_quota_backoff(mut self, backoff: QuotaBackoff) -> Self {
        self.quota_backoff = backoff;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn transport(&self) -> &Arc<dyn GenerationTransport> {
        &self.transport
    }

    /// Run `request` against `candidates` in order, returning the first success.
    ///
    /// Errors with [`Error::FatalRequest`] as soon as one attempt is fatal, and
    /// with [`Error::FallbackExhausted`] once every candidate has been skipped.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: &GenerationRequest,
        candidates: &[ModelCandidate],
    ) -> Result<Generation> {
        let wire = request.to_wire();
        let mut last_error: Option<String> = None;

        for (index, candidate) in candidates.iter().enumerate() {
            debug!(
                request_id = %ctx.id(),
                "Attempting candidate {}/{}: {}",
                index + 1,
                candidates.len(),
                candidate
            );

            match ctx.run(self.attempt(candidate, &wire)).await? {
                AttemptOutcome::Success {
                    raw_text,
                    candidate,
                } => {
                    info!(request_id = %ctx.id(), "Generation served by {}", candidate);
                    return Ok(Generation {
                        raw_text,
                        candidate,
                    });
                }
                AttemptOutcome::Skippable {
                    status,
                    reason,
                    candidate,
                } => {
                    warn!(
                        request_id = %ctx.id(),
                        status = ?status,
                        "Skipping {}: {}",
                        candidate,
                        reason
                    );
                    last_error = Some(format!("{}: {}", candidate.id, reason));
                }
                AttemptOutcome::Fatal { status, message } => {
                    return Err(Error::fatal(status, message));
                }
            }
        }

        let last_error = last_error.unwrap_or_else(|| "preference list is empty".to_string());
        error!(request_id = %ctx.id(), "All candidates failed: {}", last_error);
        Err(Error::FallbackExhausted(last_error))
    }

    /// One candidate, retried on quota rejections per the backoff schedule.
    async fn attempt(
        &self,
        candidate: &ModelCandidate,
        wire: &GenerateContentRequest,
    ) -> Result<AttemptOutcome> {
        RetryIf::start(
            self.quota_backoff.delays(),
            || self.attempt_once(candidate, wire),
            |e: &Error| {
                let retry = e.is_quota_exceeded() && self.quota_backoff.retries() > 0;
                if retry {
                    warn!("Quota exceeded on {}, backing off before retrying", candidate);
                }
                retry
            },
        )
        .await
    }

    async fn attempt_once(
        &self,
        candidate: &ModelCandidate,
        wire: &GenerateContentRequest,
    ) -> Result<AttemptOutcome> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let exchange = tokio::time::timeout(
            self.attempt_timeout,
            self.transport.generate_content(&candidate.id, wire),
        )
        .await;

        let outcome = match exchange {
            Ok(Ok(response)) => classify(&self.policy, candidate, &response),
            Ok(Err(e)) => AttemptOutcome::Skippable {
                status: None,
                reason: format!("Transport error: {}", e),
                candidate: candidate.clone(),
            },
            Err(_) => AttemptOutcome::Skippable {
                status: None,
                reason: format!("Timed out after {:?}", self.attempt_timeout),
                candidate: candidate.clone(),
            },
        };

        match outcome {
            AttemptOutcome::Fatal { status, message } => {
                error!(status = ?status, "Fatal response from {}: {}", candidate, message);
                Err(Error::fatal(status, message))
            }
            other => Ok(other),
        }
    }
}
