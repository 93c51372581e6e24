use super::types::{GenerateContentRequest, ListModelsResponse, ModelInfo};
use crate::ai::{GenerationTransport, TransportResponse};
use crate::config::{Credential, DEFAULT_BASE_URL};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const MAX_CATALOG_PAGES: usize = 20;

/// Lightweight Gemini REST client.
///
/// Holds the API key; the model is chosen per call so one client serves every
/// candidate in a preference list.
pub struct GeminiHttpClient {
    client: Client,
    api_key: Credential,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    pub fn new(api_key: Credential, timeout: Duration) -> Self {
        Self::new_with_client(api_key, timeout, Client::new())
    }

    pub fn new_with_client(api_key: Credential, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_content_url(&self, model_id: &str) -> String {
        let model_id = model_id.strip_prefix("models/").unwrap_or(model_id);
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model_id)
    }

    async fn list_models_page(&self, page_token: Option<&str>) -> Result<ListModelsResponse> {
        let mut request = self
            .client
            .get(format!("{}/v1beta/models", self.base_url))
            .timeout(self.timeout)
            .header("x-goog-api-key", self.api_key.expose());
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to list Gemini models: {}", e);
            e
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Gemini models listing failed (status {}): {}", status, error_text);
            return Err(Error::fatal(
                Some(status.as_u16()),
                format!("Model listing failed: {}", error_text),
            ));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini models listing: {}\nBody: {}", e, body);
            Error::fatal(None, format!("Failed to parse model listing: {}", e))
        })
    }
}

#[async_trait]
impl GenerationTransport for GeminiHttpClient {
    async fn generate_content(
        &self,
        model_id: &str,
        request: &GenerateContentRequest,
    ) -> Result<TransportResponse> {
        let url = self.generate_content_url(model_id);
        tracing::debug!("Sending generateContent request to {}", url);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-goog-api-key", self.api_key.expose())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to send request to Gemini ({}): {}", model_id, e);
                e
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_CATALOG_PAGES {
            let page = self.list_models_page(page_token.as_deref()).await?;
            models.extend(page.models);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Gemini catalog lists {} models", models.len());
        Ok(models)
    }
}
