//! Per-request context carried explicitly through the pipeline.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identity, overall deadline and cancellation for one pipeline run.
///
/// Every suspend point (network attempt, rate-limit wait, backoff sleep) runs
/// through [`RequestContext::run`], so a deadline or cancellation stops the
/// pipeline at the next await rather than after it completes.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Token that cancels this context (and any clones of it).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fail fast if the context is already cancelled or past its deadline.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or the
    /// deadline passes first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.checkpoint()?;

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = deadline => Err(Error::DeadlineExceeded),
            result = fut => result,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_passes_through_result() {
        let ctx = RequestContext::new();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        let err = ctx
            .run(async { Err::<(), _>(Error::Generic("boom".to_string())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generic(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_slow_future() {
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));

        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DeadlineExceeded));
        assert!(matches!(ctx.checkpoint(), Err(Error::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_future() {
        let ctx = RequestContext::new();
        let token = ctx.cancellation_token();

        let handle = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                ctx.run(async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                })
                .await
            }
        });

        token.cancel();
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_checkpoint_on_cancelled_context() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = RequestContext::new().with_cancellation(token);
        assert!(matches!(ctx.checkpoint(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_contexts_have_distinct_ids() {
        assert_ne!(RequestContext::new().id(), RequestContext::new().id());
    }
}
