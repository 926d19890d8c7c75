use std::path::Path;

use async_trait::async_trait;

pub mod completion;
pub mod recognize;
pub mod types;
pub mod yandex_gpt;
pub mod yandex_vision;
pub use types::*;

/// Trait for OCR providers (Yandex Vision, local engines, mocks).
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in the image stored at `image`.
    /// Returns the detected spans in reading order.
    async fn recognize(&self, image: &Path) -> Result<Vec<TextSpan>, AiError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Trait for LLM completion providers (YandexGPT, mocks).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run a single non-streaming completion for `prompt`.
    /// An empty vector means the provider answered but generated nothing.
    async fn complete(&self, prompt: &str) -> Result<Vec<Alternative>, AiError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Map a non-success HTTP status from a provider to an `AiError`.
pub(crate) fn error_for_status(
    status: reqwest::StatusCode,
    retry_after: Option<u64>,
    body: String,
) -> AiError {
    match status.as_u16() {
        // Rejected request: unknown model URI, bad options, oversized image.
        400 | 404 => AiError::ModelError(format!("HTTP {}: {}", status, body)),
        401 | 403 => AiError::AuthError(body),
        429 => AiError::RateLimited {
            retry_after_ms: retry_after.map(|s| s * 1000).unwrap_or(1000),
        },
        _ => AiError::ConnectionError(format!("HTTP {}: {}", status, body)),
    }
}

/// Read the `Retry-After` header (seconds form only).
pub(crate) fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
