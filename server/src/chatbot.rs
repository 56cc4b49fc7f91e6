use platform_api::{ApiError, ApiResult};
use serde_json::Value;

/// Opaque relay to the external chatbot service. Requests and responses pass
/// through untouched; this process owns no conversational state.
#[derive(Clone, Debug)]
pub struct ChatbotClient {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl ChatbotClient {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    pub async fn relay(&self, payload: Value) -> ApiResult<Value> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| ApiError::validation("chatbot endpoint is not configured"))?;
        let response = self
            .http
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(ApiError::internal)?
            .error_for_status()
            .map_err(ApiError::internal)?;
        response.json::<Value>().await.map_err(ApiError::internal)
    }
}
