use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};

use super::{
    error_for_status, retry_after_secs, AiError, BoundingBox, Credentials, Point, TextRecognizer,
    TextSpan,
};
use crate::capture::prepare_for_ocr;

pub const DEFAULT_OCR_ENDPOINT: &str = "https://ocr.api.cloud.yandex.net";
pub const DEFAULT_OCR_LANGUAGES: [&str; 2] = ["ru", "en"];

/// Yandex Vision OCR client (`ocr/v1/recognizeText`).
pub struct YandexVisionClient {
    endpoint: String,
    credentials: Credentials,
    languages: Vec<String>,
    model: String,
    jpeg_quality: u8,
    client: Client,
}

impl YandexVisionClient {
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials,
            languages: DEFAULT_OCR_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            model: "page".into(),
            jpeg_quality: 90,
            client: Client::new(),
        }
    }

    /// Override the recognition languages (default: `ru`, `en`).
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/ocr/v1/recognizeText",
            self.endpoint.trim_end_matches('/')
        )
    }

    fn build_request_body(&self, mime_type: &str, image_data: &[u8]) -> Value {
        json!({
            "mimeType": mime_type,
            "languageCodes": self.languages,
            "model": self.model,
            "content": BASE64.encode(image_data),
        })
    }
}

#[async_trait]
impl TextRecognizer for YandexVisionClient {
    async fn recognize(&self, image: &Path) -> Result<Vec<TextSpan>, AiError> {
        let raw = tokio::fs::read(image)
            .await
            .map_err(|e| AiError::ImageError(format!("read {}: {}", image.display(), e)))?;
        let prepared = prepare_for_ocr(raw, self.jpeg_quality)
            .map_err(|e| AiError::ImageError(format!("{}: {}", image.display(), e)))?;

        log::debug!(
            "Sending {} ({} bytes, {}) to Yandex OCR",
            image.display(),
            prepared.data.len(),
            prepared.mime_type
        );
        let body = self.build_request_body(prepared.mime_type, &prepared.data);

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
            .map_err(|e| AiError::InvalidResponse(format!("Invalid JSON from OCR: {}", e)))?;
        parse_recognition(&payload)
    }

    fn name(&self) -> &str {
        "yandex-vision-ocr"
    }
}

/// Extract one span per recognized line, in block order.
fn parse_recognition(payload: &Value) -> Result<Vec<TextSpan>, AiError> {
    let annotation = payload
        .pointer("/result/textAnnotation")
        .ok_or_else(|| AiError::InvalidResponse("missing result.textAnnotation".into()))?;

    let blocks = match annotation.get("blocks").and_then(|b| b.as_array()) {
        Some(blocks) => blocks,
        // No text on the image at all.
        None => return Ok(Vec::new()),
    };

    let mut spans = Vec::new();
    for block in blocks {
        let lines = block
            .get("lines")
            .and_then(|l| l.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for line in lines {
            let text = line.get("text").and_then(|t| t.as_str()).unwrap_or("");
            if text.is_empty() {
                continue;
            }
            spans.push(TextSpan {
                region: parse_bounding_box(line.get("boundingBox")),
                text: text.to_string(),
                confidence: line
                    .get("confidence")
                    .and_then(|c| c.as_f64())
                    .map(|c| c as f32),
            });
        }
    }
    Ok(spans)
}

fn parse_bounding_box(value: Option<&Value>) -> BoundingBox {
    let vertices = value
        .and_then(|b| b.get("vertices"))
        .and_then(|v| v.as_array())
        .map(|vs| {
            vs.iter()
                .map(|v| Point {
                    x: coordinate(v.get("x")),
                    y: coordinate(v.get("y")),
                })
                .collect()
        })
        .unwrap_or_default();
    BoundingBox { vertices }
}

/// Coordinates arrive as strings (`"12"`) in the JSON mapping of int64.
fn coordinate(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}
