//! Integration tests for the DialogManager pipeline using mock providers.
//! Fully deterministic: no Yandex Cloud, no Telegram.
//!
//! Run: cargo test --test dialog_manager_test

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatcoach_lib::ai::completion::{NO_ALTERNATIVES_FALLBACK, PROVIDER_FAILURE_FALLBACK};
use chatcoach_lib::ai::{AiError, Alternative, CompletionProvider, TextRecognizer, TextSpan};
use chatcoach_lib::capture::{ScreenshotDir, SessionState};
use chatcoach_lib::dialog::PromptTemplates;
use chatcoach_lib::dialog_manager::{DialogManager, Keyboard, Reply};

// ---------------------------------------------------------------------------
// Mock implementations
// ---------------------------------------------------------------------------

/// Reads the "screenshot" as UTF-8 text and returns one span per line.
struct FileTextRecognizer;

#[async_trait]
impl TextRecognizer for FileTextRecognizer {
    async fn recognize(&self, image: &Path) -> Result<Vec<TextSpan>, AiError> {
        let text = std::fs::read_to_string(image).map_err(|e| AiError::ImageError(e.to_string()))?;
        Ok(text.lines().map(TextSpan::plain).collect())
    }

    fn name(&self) -> &str {
        "file-text"
    }
}

struct FailingRecognizer;

#[async_trait]
impl TextRecognizer for FailingRecognizer {
    async fn recognize(&self, _image: &Path) -> Result<Vec<TextSpan>, AiError> {
        Err(AiError::ConnectionError("ocr unavailable".into()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Records every prompt and answers with a fixed script.
struct ScriptedCompletion {
    prompts: Mutex<Vec<String>>,
    answer: fn() -> Result<Vec<Alternative>, AiError>,
}

impl ScriptedCompletion {
    fn new(answer: fn() -> Result<Vec<Alternative>, AiError>) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            answer,
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<Vec<Alternative>, AiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.answer)()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn one_answer() -> Result<Vec<Alternative>, AiError> {
    Ok(vec![Alternative {
        text: "Предложите встретиться.".into(),
        status: "ALTERNATIVE_STATUS_FINAL".into(),
    }])
}

fn no_answer() -> Result<Vec<Alternative>, AiError> {
    Ok(Vec::new())
}

fn provider_down() -> Result<Vec<Alternative>, AiError> {
    Err(AiError::RateLimited {
        retry_after_ms: 1000,
    })
}

fn manager(
    dir: &tempfile::TempDir,
    recognizer: Arc<dyn TextRecognizer>,
    completion: Arc<dyn CompletionProvider>,
) -> DialogManager {
    DialogManager::new(
        ScreenshotDir::create(dir.path()).unwrap(),
        recognizer,
        completion,
        PromptTemplates::new("ADVICE\n{dialog}", "ANALYZE\n{dialog}").unwrap(),
    )
}

fn upload(m: &DialogManager, chat_id: i64, content: &str) -> Reply {
    let image = m.reserve_image(chat_id, "jpg").expect("slot should be open");
    std::fs::write(image.path(), content).unwrap();
    m.attach_image(chat_id, image)
}

async fn analyze(m: &DialogManager, chat_id: i64, choice: &str) -> Reply {
    let (notice, pending) = m.begin_analysis(chat_id, choice).expect("analysis should start");
    assert_eq!(notice.text, "Анализирую диалог...");
    m.run_analysis(pending).await
}

fn files_in(dir: &tempfile::TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Three screenshots, submit, "advice": the prompt carries the formatted
/// transcript and the reply is the first alternative.
#[tokio::test]
async fn advice_round_trip_builds_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let completion = ScriptedCompletion::new(one_answer);
    let m = manager(&dir, Arc::new(FileTextRecognizer), completion.clone());

    m.start(42);
    upload(&m, 42, "Аня: привет");
    upload(&m, 42, "как дела?");
    upload(&m, 42, "Я - нормально");

    let submitted = m.submit(42);
    assert_eq!(submitted.keyboard, Keyboard::AnalysisChoice);

    let reply = analyze(&m, 42, "advice").await;
    assert_eq!(reply.text, "Предложите встретиться.");

    assert_eq!(
        completion.prompts(),
        vec!["ADVICE\nАня: привет\nPerson: как дела?\nЯ - нормально".to_string()]
    );
    assert_eq!(m.session_state(42), Some(SessionState::AwaitingImages));
    assert_eq!(m.image_count(42), 0);
    assert_eq!(files_in(&dir), 0);
}

/// Spans from one screenshot are joined with spaces into a single line.
#[tokio::test]
async fn multi_line_screenshot_becomes_one_transcript_line() {
    let dir = tempfile::tempdir().unwrap();
    let completion = ScriptedCompletion::new(one_answer);
    let m = manager(&dir, Arc::new(FileTextRecognizer), completion.clone());

    m.start(1);
    upload(&m, 1, "привет\nкак ты");
    m.submit(1);
    analyze(&m, 1, "analyze").await;

    assert_eq!(completion.prompts(), vec!["ANALYZE\nPerson: привет как ты".to_string()]);
}

#[tokio::test]
async fn fourth_screenshot_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let m = manager(&dir, Arc::new(FileTextRecognizer), ScriptedCompletion::new(one_answer));

    m.start(5);
    for text in ["a", "b", "c"] {
        upload(&m, 5, text);
    }
    let refused = m.reserve_image(5, "jpg").unwrap_err();
    assert!(refused.text.starts_with("Достигнуто максимальное количество фотографий (3)."));
    assert_eq!(m.image_count(5), 3);
    assert_eq!(files_in(&dir), 3);
}

#[tokio::test]
async fn submit_without_screenshots_keeps_collecting() {
    let dir = tempfile::tempdir().unwrap();
    let completion = ScriptedCompletion::new(one_answer);
    let m = manager(&dir, Arc::new(FileTextRecognizer), completion.clone());

    m.start(9);
    let reply = m.submit(9);
    assert_eq!(reply.keyboard, Keyboard::SubmitDialog);
    assert_eq!(m.session_state(9), Some(SessionState::AwaitingImages));
    assert!(m.begin_analysis(9, "advice").is_err());
    assert!(completion.prompts().is_empty());
}

#[tokio::test]
async fn empty_alternatives_use_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let m = manager(&dir, Arc::new(FileTextRecognizer), ScriptedCompletion::new(no_answer));

    m.start(3);
    upload(&m, 3, "Оля: пока");
    m.submit(3);
    let reply = analyze(&m, 3, "advice").await;
    assert_eq!(reply.text, NO_ALTERNATIVES_FALLBACK);
    assert_eq!(m.session_state(3), Some(SessionState::AwaitingImages));
}

#[tokio::test]
async fn provider_error_uses_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let m = manager(&dir, Arc::new(FileTextRecognizer), ScriptedCompletion::new(provider_down));

    m.start(3);
    upload(&m, 3, "Оля: пока");
    m.submit(3);
    let reply = analyze(&m, 3, "analyze").await;
    assert_eq!(reply.text, PROVIDER_FAILURE_FALLBACK);
    assert_eq!(files_in(&dir), 0);
}

/// OCR failure aborts before any completion call, and still cleans up.
#[tokio::test]
async fn ocr_failure_skips_completion() {
    let dir = tempfile::tempdir().unwrap();
    let completion = ScriptedCompletion::new(one_answer);
    let m = manager(&dir, Arc::new(FailingRecognizer), completion.clone());

    m.start(8);
    upload(&m, 8, "a");
    upload(&m, 8, "b");
    m.submit(8);
    let reply = analyze(&m, 8, "advice").await;

    assert!(reply.text.starts_with("Произошла ошибка"));
    assert!(completion.prompts().is_empty());
    assert_eq!(m.session_state(8), Some(SessionState::AwaitingImages));
    assert_eq!(files_in(&dir), 0);
}

/// A second press on the same choice keyboard finds nothing to analyze.
#[tokio::test]
async fn second_choice_press_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    let completion = ScriptedCompletion::new(one_answer);
    let m = manager(&dir, Arc::new(FileTextRecognizer), completion.clone());

    m.start(4);
    upload(&m, 4, "x");
    m.submit(4);
    analyze(&m, 4, "advice").await;

    assert!(m.begin_analysis(4, "analyze").is_err());
    assert_eq!(completion.prompts().len(), 1);
}

/// Chats never see each other's screenshots.
#[tokio::test]
async fn chats_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let completion = ScriptedCompletion::new(one_answer);
    let m = manager(&dir, Arc::new(FileTextRecognizer), completion.clone());

    m.start(1);
    m.start(2);
    upload(&m, 1, "Первый: один");
    upload(&m, 2, "Второй: два");
    upload(&m, 2, "Второй: три");
    m.submit(1);

    analyze(&m, 1, "advice").await;
    assert_eq!(completion.prompts(), vec!["ADVICE\nПервый: один".to_string()]);
    assert_eq!(m.image_count(2), 2);
    assert_eq!(m.session_state(2), Some(SessionState::AwaitingImages));
}

/// /start in the middle of a collection throws the old screenshots away.
#[tokio::test]
async fn restart_discards_screenshots() {
    let dir = tempfile::tempdir().unwrap();
    let m = manager(&dir, Arc::new(FileTextRecognizer), ScriptedCompletion::new(one_answer));

    m.start(6);
    upload(&m, 6, "a");
    upload(&m, 6, "b");
    m.start(6);
    assert_eq!(m.image_count(6), 0);
    assert_eq!(files_in(&dir), 0);
}
