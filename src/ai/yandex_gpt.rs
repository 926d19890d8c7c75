use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{
    error_for_status, retry_after_secs, AiError, Alternative, CompletionProvider, Credentials,
    GenerationConfig,
};

pub const DEFAULT_LLM_ENDPOINT: &str = "https://llm.api.cloud.yandex.net";

/// YandexGPT client for the synchronous `foundationModels/v1/completion` API.
pub struct YandexGptClient {
    endpoint: String,
    credentials: Credentials,
    generation: GenerationConfig,
    client: Client,
}

impl YandexGptClient {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Credentials,
        generation: GenerationConfig,
    ) -> Self {
        log::info!(
            "YandexGPT client configured with model={}, temperature={}, max_tokens={} (bearer={})",
            generation.model,
            generation.temperature,
            generation.max_tokens,
            credentials.use_bearer
        );
        Self {
            endpoint: endpoint.into(),
            credentials,
            generation,
            client: Client::new(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/foundationModels/v1/completion",
            self.endpoint.trim_end_matches('/')
        )
    }

    /// `gpt://<folder>/<model>/latest`, unless the model is already a full URI.
    fn model_uri(&self) -> String {
        if self.generation.model.contains("://") {
            self.generation.model.clone()
        } else {
            format!(
                "gpt://{}/{}/latest",
                self.credentials.folder_id, self.generation.model
            )
        }
    }

    fn build_request_body(&self, prompt: &str) -> Value {
        json!({
            "modelUri": self.model_uri(),
            "completionOptions": {
                "stream": false,
                "temperature": self.generation.temperature,
                // int64 values travel as strings in the JSON mapping.
                "maxTokens": self.generation.max_tokens.to_string(),
            },
            "messages": [
                { "role": "user", "text": prompt }
            ]
        })
    }
}

#[async_trait]
impl CompletionProvider for YandexGptClient {
    async fn complete(&self, prompt: &str) -> Result<Vec<Alternative>, AiError> {
        let body = self.build_request_body(prompt);

        let response = self
            .client
            .post(self.url())
            .header("Authorization", self.credentials.authorization())
            .header("x-folder-id", &self.credentials.folder_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(&response);
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".into());
            return Err(error_for_status(status, retry_after, error_body));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("Invalid JSON from YandexGPT: {}", e)))?;
        parse_completion(&payload)
    }

    fn name(&self) -> &str {
        "yandexgpt"
    }
}

fn parse_completion(payload: &Value) -> Result<Vec<Alternative>, AiError> {
    let result = payload
        .get("result")
        .ok_or_else(|| AiError::InvalidResponse("missing result".into()))?;

    if let Some(version) = result.get("modelVersion").and_then(|v| v.as_str()) {
        log::debug!("YandexGPT model version {}", version);
    }

    let alternatives = match result.get("alternatives").and_then(|a| a.as_array()) {
        Some(alternatives) => alternatives,
        None => return Ok(Vec::new()),
    };

    alternatives
        .iter()
        .map(|alt| {
            let text = alt
                .pointer("/message/text")
                .and_then(|t| t.as_str())
                .ok_or_else(|| AiError::InvalidResponse("alternative without message.text".into()))?;
            let status = alt
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or("ALTERNATIVE_STATUS_UNSPECIFIED");
            if status == "ALTERNATIVE_STATUS_CONTENT_FILTER" {
                log::warn!("YandexGPT alternative was content-filtered");
            }
            Ok(Alternative {
                text: text.to_string(),
                status: status.to_string(),
            })
        })
        .collect()
}
