use serde::{Deserialize, Serialize};

/// A corner of a recognized text region, in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// Polygon around a recognized text span (usually four vertices).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub vertices: Vec<Point>,
}

/// One piece of text detected by an OCR provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub region: BoundingBox,
    pub text: String,
    /// Not every provider reports confidence per span.
    pub confidence: Option<f32>,
}

impl TextSpan {
    /// Span without position or confidence, handy for mocks and tests.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            region: BoundingBox::default(),
            text: text.into(),
            confidence: None,
        }
    }
}

/// A single generated alternative returned by a completion provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub text: String,
    pub status: String,
}

/// Error type for AI operations
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),
    #[error("Authentication failed: {0}")]
    AuthError(String),
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("Model error: {0}")]
    ModelError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Image error: {0}")]
    ImageError(String),
}

/// Fixed generation parameters, read once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "yandexgpt".into(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// Yandex Cloud credentials shared by the OCR and completion clients.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub auth_token: String,
    pub folder_id: String,
    /// When true, use `Authorization: Bearer` (IAM token) instead of `Api-Key`.
    pub use_bearer: bool,
}

impl Credentials {
    pub fn new(auth_token: impl Into<String>, folder_id: impl Into<String>) -> Self {
        let auth_token = auth_token.into();
        let use_bearer = looks_like_iam_token(&auth_token);
        Self {
            auth_token,
            folder_id: folder_id.into(),
            use_bearer,
        }
    }

    /// Force Bearer auth regardless of the token shape.
    pub fn with_bearer(mut self, use_bearer: bool) -> Self {
        self.use_bearer = use_bearer;
        self
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        if self.use_bearer {
            format!("Bearer {}", self.auth_token)
        } else {
            format!("Api-Key {}", self.auth_token)
        }
    }
}

// Tokens never show up in Debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_token", &"<redacted>")
            .field("folder_id", &self.folder_id)
            .field("use_bearer", &self.use_bearer)
            .finish()
    }
}

/// IAM tokens issued by Yandex Cloud start with `t1.`.
pub fn looks_like_iam_token(token: &str) -> bool {
    token.starts_with("t1.")
}
