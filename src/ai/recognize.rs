use std::path::PathBuf;

use super::{AiError, TextRecognizer};

/// Run OCR over the screenshots in order and collect the text.
///
/// Spans from one image are joined with a single space; images are joined
/// with `\n`, so each screenshot becomes one line of the result. The first
/// failing image aborts the whole extraction.
pub async fn extract_text(
    recognizer: &dyn TextRecognizer,
    images: &[PathBuf],
) -> Result<String, AiError> {
    log::info!(
        "Extracting text from {} image(s) with {}",
        images.len(),
        recognizer.name()
    );
    let mut full_text = Vec::with_capacity(images.len());

    for path in images {
        let spans = recognizer.recognize(path).await.map_err(|e| {
            log::error!("OCR failed for {}: {}", path.display(), e);
            e
        })?;
        let text = spans
            .iter()
            .map(|span| span.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        log::debug!(
            "Recognized {} span(s), {} chars in {}",
            spans.len(),
            text.chars().count(),
            path.display()
        );
        full_text.push(text);
    }

    Ok(full_text.join("\n"))
}
