// dialog_manager.rs: Orchestrates screenshots → OCR → transcript → prompt → LLM.
//
// Transport-independent: every handler takes a chat id and returns the
// `Reply` to send. The Telegram layer only downloads files and renders replies.

use std::path::PathBuf;
use std::sync::Arc;

use crate::ai::completion::{generate_response, NO_ALTERNATIVES_FALLBACK};
use crate::ai::recognize::extract_text;
use crate::ai::{CompletionProvider, TextRecognizer};
use crate::capture::{
    AddImage, ImageSlot, ScreenshotDir, SessionState, SessionStore, Submit, TempImage, MAX_IMAGES,
};
use crate::dialog::{format_dialog, AnalysisKind, PromptTemplates};

/// Label of the reply-keyboard button that submits the collected screenshots.
pub const SUBMIT_BUTTON: &str = "Отправить диалог";

const GREETING: &str = "Привет! Я помогу проанализировать ваш диалог и дать советы по общению.\n\
Отправьте мне скриншот диалога (можно загрузить до 3 скриншотов), \
затем нажмите 'Отправить диалог'.";
const HELP: &str = "Как это работает:\n\
1. Отправьте от 1 до 3 скриншотов переписки.\n\
2. Нажмите 'Отправить диалог'.\n\
3. Выберите «Что сказать?» или «Анализ диалога».\n\n\
/start — начать заново, /cancel — сбросить загруженные скриншоты.";
const REQUEST_IMAGES: &str = "Пожалуйста, отправьте от 1 до 3 скриншотов диалога.";
const NO_IMAGES_YET: &str = "Сначала отправьте хотя бы один скриншот диалога.";
const MAX_REACHED: &str = "Достигнуто максимальное количество фотографий (3).\n\
Нажмите 'Отправить диалог' для анализа.";
const CHOOSE_ANALYSIS: &str = "Начинаю анализ диалога.\nВыберите тип анализа:";
const CHOICE_PENDING: &str = "Выберите тип анализа с помощью кнопок ниже:";
const NOT_COLLECTING: &str = "Чтобы начать, отправьте /start или нажмите 'Отправить диалог'.";
const ANALYZING: &str = "Анализирую диалог...";
const PHOTO_FAILED: &str = "Произошла ошибка при обработке фото. Пожалуйста, попробуйте еще раз.";
const UNSUPPORTED_IMAGE: &str =
    "Не удалось распознать изображение. Отправьте скриншот в формате JPEG или PNG.";
const ANALYSIS_FAILED: &str =
    "Произошла ошибка при обработке запроса. Пожалуйста, попробуйте еще раз.";
const STALE_CHOICE: &str =
    "Нет скриншотов для анализа. Отправьте скриншоты и нажмите 'Отправить диалог'.";
const CANCELLED: &str = "Загруженные скриншоты удалены. Отправьте /start, чтобы начать заново.";
const UNKNOWN_INPUT: &str =
    "Я понимаю только скриншоты диалога. Отправьте скриншот или нажмите 'Отправить диалог'.";

/// Keyboard attached to an outgoing reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    None,
    /// Persistent reply keyboard with the single "Отправить диалог" button.
    SubmitDialog,
    /// Inline buttons for `advice` / `analyze`.
    AnalysisChoice,
}

/// A message to send back to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }
}

/// Screenshots handed over for one analysis run, already removed from the session.
/// Dropping it deletes the files.
#[derive(Debug)]
pub struct PendingAnalysis {
    pub chat_id: i64,
    pub kind: AnalysisKind,
    images: Vec<TempImage>,
}

impl PendingAnalysis {
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

/// Shared state for the dialog pipeline.
pub struct DialogManager {
    sessions: SessionStore,
    screenshots: ScreenshotDir,
    recognizer: Arc<dyn TextRecognizer>,
    completion: Arc<dyn CompletionProvider>,
    prompts: PromptTemplates,
}

impl DialogManager {
    pub fn new(
        screenshots: ScreenshotDir,
        recognizer: Arc<dyn TextRecognizer>,
        completion: Arc<dyn CompletionProvider>,
        prompts: PromptTemplates,
    ) -> Self {
        log::info!(
            "DialogManager: OCR provider {}, completion provider {}",
            recognizer.name(),
            completion.name()
        );
        Self {
            sessions: SessionStore::new(),
            screenshots,
            recognizer,
            completion,
            prompts,
        }
    }

    pub fn session_state(&self, chat_id: i64) -> Option<SessionState> {
        self.sessions.state(chat_id)
    }

    pub fn image_count(&self, chat_id: i64) -> usize {
        self.sessions.image_count(chat_id)
    }

    /// `/start`: begin collecting, discarding anything collected before.
    pub fn start(&self, chat_id: i64) -> Reply {
        let discarded = self.sessions.start(chat_id);
        if discarded > 0 {
            log::info!("Chat {}: restarted, discarded {} screenshot(s)", chat_id, discarded);
        } else {
            log::info!(
                "Chat {}: started ({} active session(s))",
                chat_id,
                self.sessions.len()
            );
        }
        Reply::with_keyboard(GREETING, Keyboard::SubmitDialog)
    }

    pub fn help(&self) -> Reply {
        Reply::with_keyboard(HELP, Keyboard::SubmitDialog)
    }

    /// `/cancel`: drop the session and its screenshots.
    pub fn cancel(&self, chat_id: i64) -> Reply {
        if self.sessions.remove(chat_id) {
            log::info!("Chat {}: session cancelled", chat_id);
            if self.sessions.is_empty() {
                log::debug!("No active sessions left");
            }
        }
        Reply::text(CANCELLED)
    }

    /// Any text that is neither a command nor the submit button.
    pub fn unknown_input(&self, chat_id: i64) -> Reply {
        log::debug!("Chat {}: ignoring unrecognized text", chat_id);
        match self.sessions.state(chat_id) {
            Some(SessionState::ReadyForAnalysis) => {
                Reply::with_keyboard(CHOICE_PENDING, Keyboard::AnalysisChoice)
            }
            _ => Reply::with_keyboard(UNKNOWN_INPUT, Keyboard::SubmitDialog),
        }
    }

    /// The "Отправить диалог" button.
    pub fn submit(&self, chat_id: i64) -> Reply {
        match self.sessions.submit(chat_id) {
            Submit::Started => {
                log::info!("Chat {}: waiting for screenshots", chat_id);
                Reply::with_keyboard(REQUEST_IMAGES, Keyboard::SubmitDialog)
            }
            Submit::NoImages => {
                log::warn!("Chat {}: submit without screenshots", chat_id);
                Reply::with_keyboard(NO_IMAGES_YET, Keyboard::SubmitDialog)
            }
            Submit::Ready { count } => {
                log::info!("Chat {}: dialog submitted with {} screenshot(s)", chat_id, count);
                Reply::with_keyboard(CHOOSE_ANALYSIS, Keyboard::AnalysisChoice)
            }
            Submit::AlreadyReady { .. } => {
                Reply::with_keyboard(CHOICE_PENDING, Keyboard::AnalysisChoice)
            }
        }
    }

    /// Reserve a file for an incoming screenshot, or explain why none is taken.
    /// `extension` is only cosmetic; the OCR client sniffs the real format.
    pub fn reserve_image(&self, chat_id: i64, extension: &str) -> Result<TempImage, Reply> {
        match self.sessions.slot(chat_id) {
            ImageSlot::Open { .. } => Ok(self.screenshots.allocate(chat_id, extension)),
            ImageSlot::Full => {
                log::warn!("Chat {}: maximum number of screenshots reached", chat_id);
                Err(Reply::with_keyboard(MAX_REACHED, Keyboard::SubmitDialog))
            }
            ImageSlot::AwaitingChoice => {
                Err(Reply::with_keyboard(CHOICE_PENDING, Keyboard::AnalysisChoice))
            }
            ImageSlot::Idle => Err(Reply::with_keyboard(NOT_COLLECTING, Keyboard::SubmitDialog)),
        }
    }

    /// A reserved screenshot has been written to disk.
    pub fn attach_image(&self, chat_id: i64, image: TempImage) -> Reply {
        match self.sessions.add_image(chat_id, image) {
            AddImage::Added { count } => {
                log::info!("Chat {}: screenshot saved, total {}", chat_id, count);
                if count >= MAX_IMAGES {
                    Reply::with_keyboard(MAX_REACHED, Keyboard::SubmitDialog)
                } else {
                    Reply::with_keyboard(
                        format!(
                            "Фото {} загружено.\nОтправьте ещё один скриншот или нажмите 'Отправить диалог' для анализа.",
                            count
                        ),
                        Keyboard::SubmitDialog,
                    )
                }
            }
            // The session changed while the file was downloading.
            AddImage::Full(rejected) => {
                drop(rejected);
                Reply::with_keyboard(MAX_REACHED, Keyboard::SubmitDialog)
            }
            AddImage::NotCollecting(rejected) => {
                drop(rejected);
                Reply::with_keyboard(NOT_COLLECTING, Keyboard::SubmitDialog)
            }
        }
    }

    /// Downloading a reserved screenshot failed; the partial file goes away.
    pub fn image_failed(
        &self,
        chat_id: i64,
        image: TempImage,
        error: &dyn std::fmt::Display,
    ) -> Reply {
        log::error!(
            "Chat {}: error saving screenshot {}: {}",
            chat_id,
            image.path().display(),
            error
        );
        drop(image);
        Reply::text(PHOTO_FAILED)
    }

    /// A downloaded file turned out not to be a decodable image.
    pub fn unsupported_image(
        &self,
        chat_id: i64,
        image: TempImage,
        error: &dyn std::fmt::Display,
    ) -> Reply {
        log::warn!(
            "Chat {}: rejected screenshot {}: {}",
            chat_id,
            image.path().display(),
            error
        );
        drop(image);
        Reply::with_keyboard(UNSUPPORTED_IMAGE, Keyboard::SubmitDialog)
    }

    /// Inline button press. On success returns the progress notice to send
    /// right away and the work to finish with `run_analysis`.
    pub fn begin_analysis(
        &self,
        chat_id: i64,
        callback_data: &str,
    ) -> Result<(Reply, PendingAnalysis), Reply> {
        let kind = match AnalysisKind::from_callback_data(callback_data) {
            Some(kind) => kind,
            None => {
                log::warn!("Chat {}: unknown callback data {:?}", chat_id, callback_data);
                return Err(Reply::text(STALE_CHOICE));
            }
        };

        match self.sessions.take_for_analysis(chat_id) {
            Some(images) => {
                log::info!(
                    "Chat {}: {:?} requested for {} screenshot(s)",
                    chat_id,
                    kind,
                    images.len()
                );
                Ok((
                    Reply::text(ANALYZING),
                    PendingAnalysis {
                        chat_id,
                        kind,
                        images,
                    },
                ))
            }
            None => {
                log::warn!("Chat {}: {:?} pressed with nothing to analyze", chat_id, kind);
                Err(Reply::with_keyboard(STALE_CHOICE, Keyboard::SubmitDialog))
            }
        }
    }

    /// OCR the screenshots, build the prompt, and ask the LLM.
    /// The screenshots are deleted as soon as OCR is done, whatever the outcome.
    pub async fn run_analysis(&self, pending: PendingAnalysis) -> Reply {
        let PendingAnalysis {
            chat_id,
            kind,
            images,
        } = pending;

        let paths: Vec<PathBuf> = images.iter().map(|i| i.path().to_path_buf()).collect();
        let extracted = extract_text(self.recognizer.as_ref(), &paths).await;
        drop(images);

        let text = match extracted {
            Ok(text) => text,
            Err(e) => {
                log::error!("Chat {}: text extraction failed: {}", chat_id, e);
                return Reply::text(ANALYSIS_FAILED);
            }
        };

        let transcript = format_dialog(&text);
        log::debug!(
            "Chat {}: transcript has {} line(s)",
            chat_id,
            transcript.lines().count()
        );

        let prompt = match self.prompts.build(kind, &transcript) {
            Ok(prompt) => prompt,
            Err(e) => {
                log::error!("Chat {}: cannot build prompt: {}", chat_id, e);
                return Reply::text(ANALYSIS_FAILED);
            }
        };

        let completion = generate_response(self.completion.as_ref(), &prompt).await;
        if completion.is_generated() {
            log::info!("Chat {}: analysis finished", chat_id);
        } else {
            log::warn!("Chat {}: analysis ended with a fallback reply", chat_id);
        }

        let text = completion.into_reply_text();
        if text.trim().is_empty() {
            // Telegram refuses empty messages.
            return Reply::text(NO_ALTERNATIVES_FALLBACK);
        }
        Reply::text(text)
    }
}
