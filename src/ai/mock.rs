use super::gemini::{GenerateContentRequest, ModelInfo};
use super::{GenerationTransport, TransportResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock does for one call.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Reply(TransportResponse),
    /// Fail the exchange as if the network dropped.
    TransportError(String),
    /// Wait before replying, to exercise timeouts and deadlines.
    Delayed(Duration, TransportResponse),
}

impl ScriptedResponse {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        ScriptedResponse::Reply(TransportResponse::new(status, body))
    }

    /// A 200 whose first candidate carries `text`.
    pub fn text(text: &str) -> Self {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        });
        Self::status(200, body.to_string())
    }
}

/// In-memory transport with per-model scripted responses and a call log.
///
/// Responses for a model are consumed in order; the last one repeats. Models
/// with no script answer 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    scripts: Arc<Mutex<HashMap<String, VecDeque<ScriptedResponse>>>>,
    calls: Arc<Mutex<Vec<(String, GenerateContentRequest)>>>,
    models: Arc<Mutex<Vec<ModelInfo>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, model_id: &str, response: ScriptedResponse) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(model_id.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn with_model(self, info: ModelInfo) -> Self {
        self.models.lock().unwrap().push(info);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Model IDs in the order they were called.
    pub fn called_models(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(model, _)| model.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<GenerateContentRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    fn next_response(&self, model_id: &str) -> ScriptedResponse {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(model_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => ScriptedResponse::status(404, "model not found"),
        }
    }
}

#[async_trait]
impl GenerationTransport for MockTransport {
    async fn generate_content(
        &self,
        model_id: &str,
        request: &GenerateContentRequest,
    ) -> Result<TransportResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((model_id.to_string(), request.clone()));

        match self.next_response(model_id) {
            ScriptedResponse::Reply(response) => Ok(response),
            ScriptedResponse::TransportError(message) => Err(Error::Generic(message)),
            ScriptedResponse::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(self.models.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::GenerateContentRequest;

    fn empty_request() -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![],
            generation_config: None,
        }
    }

    #[tokio::test]
    async fn test_unscripted_model_answers_404() {
        let transport = MockTransport::new();
        let response = transport
            .generate_content("nope", &empty_request())
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(transport.called_models(), vec!["nope".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order_then_repeat_last() {
        let transport = MockTransport::new()
            .with_response("m", ScriptedResponse::status(503, "busy"))
            .with_response("m", ScriptedResponse::text("ok"));

        let request = empty_request();
        let first = transport.generate_content("m", &request).await.unwrap();
        let second = transport.generate_content("m", &request).await.unwrap();
        let third = transport.generate_content("m", &request).await.unwrap();

        assert_eq!(first.status, 503);
        assert_eq!(second.status, 200);
        assert_eq!(third, second);
        assert_eq!(transport.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_error() {
        let transport =
            MockTransport::new().with_response("m", ScriptedResponse::TransportError("reset".into()));
        let err = transport
            .generate_content("m", &empty_request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reset"));
    }
}
