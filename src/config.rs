//! Runtime configuration loaded from the environment.

use crate::fallback::{QuotaBackoff, StatusPolicy};
use crate::models::Preferences;
use crate::rate_limit::RateLimiterConfig;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// API key wrapper that never prints its value.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First few characters, for diagnostics output.
    pub fn hint(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Credential,
    pub base_url: String,
    pub preferences: Preferences,
    pub status_policy: StatusPolicy,
    pub attempt_timeout: Duration,
    pub pipeline_deadline: Option<Duration>,
    pub rate_limit: Option<RateLimiterConfig>,
    pub quota_backoff: QuotaBackoff,
    pub contact_handle: Option<String>,
}

impl Config {
    /// Load `.env` (if present) and read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY")
            .map(Credential::new)
            .ok_or_else(|| Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let preferences = match get("MODEL_PREFERENCES_FILE") {
            Some(path) => Preferences::from_file(&PathBuf::from(path))?,
            None => Preferences::bundled()?,
        };

        let status_policy = match get("SKIPPABLE_STATUSES") {
            Some(list) => StatusPolicy::new(parse_status_list(&list)?),
            None => match &preferences.skippable_statuses {
                Some(statuses) => StatusPolicy::new(statuses.iter().copied()),
                None => StatusPolicy::default(),
            },
        };

        let attempt_timeout =
            Duration::from_secs(parse_or(get("ATTEMPT_TIMEOUT_SECS"), "ATTEMPT_TIMEOUT_SECS", 30)?);

        let deadline_secs: u64 =
            parse_or(get("PIPELINE_DEADLINE_SECS"), "PIPELINE_DEADLINE_SECS", 180)?;
        let pipeline_deadline = (deadline_secs > 0).then(|| Duration::from_secs(deadline_secs));

        let per_sec: f64 = parse_or(get("RATE_LIMIT_PER_SEC"), "RATE_LIMIT_PER_SEC", 0.5)?;
        let burst: f64 = parse_or(get("RATE_LIMIT_BURST"), "RATE_LIMIT_BURST", 1.0)?;
        let rate_limit = if per_sec > 0.0 {
            Some(RateLimiterConfig::new(burst, per_sec)?)
        } else {
            None
        };

        let retries: usize = parse_or(get("QUOTA_RETRIES"), "QUOTA_RETRIES", 0)?;
        let delay_ms: u64 = parse_or(get("QUOTA_RETRY_DELAY_MS"), "QUOTA_RETRY_DELAY_MS", 2000)?;
        let linear: bool = parse_or(get("QUOTA_RETRY_LINEAR"), "QUOTA_RETRY_LINEAR", false)?;
        let quota_backoff = if linear {
            QuotaBackoff::linear(retries, Duration::from_millis(delay_ms))
        } else {
            QuotaBackoff::fixed(retries, Duration::from_millis(delay_ms))
        };

        Ok(Self {
            api_key,
            base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            preferences,
            status_policy,
            attempt_timeout,
            pipeline_deadline,
            rate_limit,
            quota_backoff,
            contact_handle: get("CONTACT_HANDLE"),
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Invalid value for {}: '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_status_list(raw: &str) -> Result<Vec<u16>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u16>()
                .map_err(|_| Error::Config(format!("Invalid HTTP status in SKIPPABLE_STATUSES: '{}'", s)))
        })
        .collect()
}
