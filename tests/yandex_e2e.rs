//! E2E test: sends a real screenshot to Yandex Vision OCR, then the formatted
//! transcript to YandexGPT, and checks that both answer.
//!
//! Requires environment variables:
//!   YANDEX_AUTH_TOKEN     - API key or IAM token (`t1.` prefix)
//!   YANDEX_FOLDER_ID      - folder that owns the key
//!   CHATCOACH_E2E_IMAGE   - path to a JPEG/PNG screenshot of a dialog
//!
//! Run: cargo test --test yandex_e2e -- --ignored

use std::path::PathBuf;

use chatcoach_lib::ai::completion::{generate_response, Completion};
use chatcoach_lib::ai::recognize::extract_text;
use chatcoach_lib::ai::yandex_gpt::{YandexGptClient, DEFAULT_LLM_ENDPOINT};
use chatcoach_lib::ai::yandex_vision::{YandexVisionClient, DEFAULT_OCR_ENDPOINT};
use chatcoach_lib::ai::{Credentials, GenerationConfig};
use chatcoach_lib::dialog::{format_dialog, AnalysisKind, PromptTemplates};

fn get_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("Set {} env var to run this test", key))
}

#[tokio::test]
#[ignore] // Only run manually with --ignored flag
async fn screenshot_to_advice() {
    let credentials = Credentials::new(get_env("YANDEX_AUTH_TOKEN"), get_env("YANDEX_FOLDER_ID"));
    let image = PathBuf::from(get_env("CHATCOACH_E2E_IMAGE"));

    let ocr = YandexVisionClient::new(DEFAULT_OCR_ENDPOINT, credentials.clone());
    let text = extract_text(&ocr, &[image]).await.expect("OCR failed");
    println!("Recognized:\n{text}");
    assert!(!text.trim().is_empty(), "no text recognized");

    let transcript = format_dialog(&text);
    let prompt = PromptTemplates::default()
        .build(AnalysisKind::Advice, &transcript)
        .expect("prompt build failed");

    let gpt = YandexGptClient::new(DEFAULT_LLM_ENDPOINT, credentials, GenerationConfig::default());
    match generate_response(&gpt, &prompt).await {
        Completion::Generated(answer) => {
            println!("Advice:\n{answer}");
            assert!(!answer.trim().is_empty());
        }
        other => panic!("expected generated advice, got {:?}", other),
    }
}
