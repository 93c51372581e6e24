//! Pipeline orchestration: analyze a listing, then write the video script and
//! the social post from that analysis.

use crate::ai::{GeminiHttpClient, GenerationTransport};
use crate::config::Config;
use crate::context::RequestContext;
use crate::fallback::FallbackExecutor;
use crate::models::{
    Analysis, Generated, GenerationRequest, ListingInput, MarketingAssets, Preferences,
    SocialPost, TaskCategory, VideoScript,
};
use crate::rate_limit::RateLimiter;
use crate::{prompts, recovery, Error, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_CONTACT: &str = "Send us a message for details";

/// Runs the three generation steps in order against the configured
/// preference lists.
pub struct App {
    executor: FallbackExecutor,
    preferences: Preferences,
    deadline: Option<Duration>,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub transport: Arc<dyn GenerationTransport>,
    pub preferences: Preferences,
}

impl App {
    /// Build an app around an arbitrary transport with default executor
    /// settings and no deadline.
    pub fn with_services(services: AppServices) -> Self {
        Self {
            executor: FallbackExecutor::new(services.transport),
            preferences: services.preferences,
            deadline: None,
        }
    }

    pub fn with_executor(executor: FallbackExecutor, preferences: Preferences) -> Self {
        Self {
            executor,
            preferences,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Construct an app talking to Gemini from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        let transport = GeminiHttpClient::new(config.api_key.clone(), config.attempt_timeout)
            .with_base_url(config.base_url.clone());
        info!("Using Gemini endpoint {}", transport.base_url());

        let mut executor = FallbackExecutor::new(Arc::new(transport))
            .with_status_policy(config.status_policy.clone())
            .with_attempt_timeout(config.attempt_timeout)
            .with_quota_backoff(config.quota_backoff.clone());
        if let Some(rate_limit) = &config.rate_limit {
            info!(
                "Rate limiting provider calls to {}/s (burst {})",
                rate_limit.refill_per_sec, rate_limit.capacity
            );
            executor = executor.with_rate_limiter(Arc::new(RateLimiter::new(rate_limit.clone())));
        }

        Self::with_executor(executor, config.preferences.clone()).with_deadline(config.pipeline_deadline)
    }

    pub fn executor(&self) -> &FallbackExecutor {
        &self.executor
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Fresh context carrying this app's pipeline deadline.
    pub fn new_context(&self) -> RequestContext {
        match self.deadline {
            Some(deadline) => RequestContext::new().with_timeout(deadline),
            None => RequestContext::new(),
        }
    }

    /// Run all three steps: analysis, then script, then social post.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        input: &ListingInput,
        contact: Option<&str>,
    ) -> Result<MarketingAssets> {
        info!(request_id = %ctx.id(), "Generating marketing assets ({} input)", input.category());

        let analysis = self.analyze(ctx, input).await?;
        let script = self.generate_script(ctx, &analysis.value).await?;
        let social_post = self
            .generate_social_post(ctx, &analysis.value, contact)
            .await?;

        info!(request_id = %ctx.id(), "Marketing assets complete");
        Ok(MarketingAssets {
            request_id: ctx.id(),
            generated_at: Utc::now(),
            analysis,
            script,
            social_post,
        })
    }

    pub async fn analyze(
        &self,
        ctx: &RequestContext,
        input: &ListingInput,
    ) -> Result<Generated<Analysis>> {
        let request = match input {
            ListingInput::Text(text) => {
                if text.trim().is_empty() {
                    return Err(Error::Generic("Listing text is empty".to_string()));
                }
                GenerationRequest::text(prompts::render(
                    prompts::ANALYZE_TEXT,
                    &[("input", text.trim())],
                ))
            }
            ListingInput::Image { bytes, mime_type } => {
                if bytes.is_empty() {
                    return Err(Error::Generic("Listing image is empty".to_string()));
                }
                GenerationRequest::text(prompts::ANALYZE_IMAGE)
                    .with_image(bytes, mime_type.as_deref())
            }
        };

        self.generate(ctx, "analysis", input.category(), request.expecting_json())
            .await
    }

    pub async fn generate_script(
        &self,
        ctx: &RequestContext,
        analysis: &Analysis,
    ) -> Result<Generated<VideoScript>> {
        let keywords = analysis.keywords.join(", ");
        let prompt = prompts::render(
            prompts::VIDEO_SCRIPT,
            &[("summary", &analysis.summary), ("keywords", &keywords)],
        );

        self.generate(
            ctx,
            "video script",
            TaskCategory::Text,
            GenerationRequest::text(prompt).expecting_json(),
        )
        .await
    }

    pub async fn generate_social_post(
        &self,
        ctx: &RequestContext,
        analysis: &Analysis,
        contact: Option<&str>,
    ) -> Result<Generated<SocialPost>> {
        let keywords = analysis.keywords.join(", ");
        let contact = contact
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CONTACT);
        let prompt = prompts::render(
            prompts::SOCIAL_POST,
            &[
                ("summary", &analysis.summary),
                ("keywords", &keywords),
                ("contact", contact),
            ],
        );

        self.generate(
            ctx,
            "social post",
            TaskCategory::Text,
            GenerationRequest::text(prompt).expecting_json(),
        )
        .await
    }

    /// One executor call followed by one recovery parse.
    async fn generate<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        step: &str,
        category: TaskCategory,
        request: GenerationRequest,
    ) -> Result<Generated<T>> {
        info!(request_id = %ctx.id(), "[{}] Generating with {} models", step, category);

        let candidates = self.preferences.for_category(category);
        let generation = self
            .executor
            .execute(ctx, &request, candidates)
            .await
            .map_err(|e| {
                error!(request_id = %ctx.id(), "[{}] Generation failed: {}", step, e);
                e
            })?;

        let value = recovery::parse_as::<T>(&generation.raw_text).map_err(|e| {
            error!(
                request_id = %ctx.id(),
                "[{}] Could not parse response from {}: {}\nText: {}",
                step,
                generation.candidate,
                e,
                generation.raw_text
            );
            e
        })?;

        Ok(Generated {
            model: generation.candidate,
            value,
        })
    }
}
