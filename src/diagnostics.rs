//! Connection diagnostics: list the model catalog and probe single models.

use crate::ai::gemini::ModelInfo;
use crate::ai::GenerationTransport;
use crate::context::RequestContext;
use crate::fallback::FallbackExecutor;
use crate::models::{GenerationRequest, ModelCandidate};
use crate::{prompts, Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// Catalog entries that support `generateContent`, in catalog order.
pub async fn generation_models(transport: &dyn GenerationTransport) -> Result<Vec<ModelInfo>> {
    let models = transport.list_models().await?;
    let total = models.len();
    let usable: Vec<ModelInfo> = models
        .into_iter()
        .filter(ModelInfo::supports_generate_content)
        .collect();
    tracing::info!(
        "{} of {} catalog models support generateContent",
        usable.len(),
        total
    );
    Ok(usable)
}

/// Turn catalog entries into a preference list, keeping catalog order.
pub fn candidates_from_catalog(models: &[ModelInfo]) -> Vec<ModelCandidate> {
    models
        .iter()
        .map(|m| ModelCandidate::new(m.id(), m.display_name.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeStatus {
    Ok { reply: String },
    Unavailable { detail: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub model: String,
    pub checked_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub status: ProbeStatus,
}

impl ProbeReport {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, ProbeStatus::Ok { .. })
    }
}

/// Send a short test prompt to exactly one model.
///
/// Never errors: every outcome is folded into the report.
pub async fn probe(executor: &FallbackExecutor, ctx: &RequestContext, model_id: &str) -> ProbeReport {
    let candidate = ModelCandidate::new(model_id, "");
    let started = Instant::now();
    tracing::info!("Probing model {}", candidate.id);

    let request = GenerationRequest::text(prompts::PROBE.trim());
    let status = match executor
        .execute(ctx, &request, std::slice::from_ref(&candidate))
        .await
    {
        Ok(generation) => ProbeStatus::Ok {
            reply: generation.raw_text.trim().to_string(),
        },
        Err(Error::FallbackExhausted(detail)) => ProbeStatus::Unavailable { detail },
        Err(e) => ProbeStatus::Failed {
            error: e.to_string(),
        },
    };

    ProbeReport {
        model: candidate.id,
        checked_at: Utc::now(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        status,
    }
}
