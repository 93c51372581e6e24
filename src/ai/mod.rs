//! Generative-language provider integration
//!
//! The fallback executor talks to the provider through [`GenerationTransport`],
//! which reports the raw HTTP status and body of each call instead of turning
//! non-2xx responses into errors. Classification happens in the executor.

pub mod gemini;
pub mod mock;

pub use gemini::{GeminiHttpClient, GenerateContentRequest, ModelInfo};
pub use mock::{MockTransport, ScriptedResponse};

use crate::Result;
use async_trait::async_trait;

/// Status code and body of one completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Issue one `generateContent` call for `model_id`.
    ///
    /// `Err` means the exchange itself failed (connection, timeout). Any HTTP
    /// response, successful or not, is returned as `Ok`.
    async fn generate_content(
        &self,
        model_id: &str,
        request: &GenerateContentRequest,
    ) -> Result<TransportResponse>;

    /// List the provider's model catalog.
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}
