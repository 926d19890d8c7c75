pub mod ai;
pub mod capture;
pub mod dialog;
pub mod dialog_manager;
pub mod settings;
pub mod telegram;

use std::sync::Arc;

use ai::yandex_gpt::YandexGptClient;
use ai::yandex_vision::YandexVisionClient;
use capture::ScreenshotDir;
use dialog_manager::DialogManager;
use settings::{Settings, SettingsError};
use telegram::TelegramAdapter;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Settings(#[from] SettingsError),
    #[error("cannot prepare screenshot directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the pipeline from settings and serve Telegram updates until Ctrl+C.
pub async fn run() -> Result<(), StartupError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load()?;
    log::debug!("Effective settings: {:?}", settings);

    let screenshots = ScreenshotDir::create(&settings.temp_dir)?;

    let credentials = settings.credentials();
    let recognizer = YandexVisionClient::new(&settings.ocr_endpoint, credentials.clone())
        .with_languages(settings.ocr_languages.iter().cloned());
    let completion =
        YandexGptClient::new(&settings.llm_endpoint, credentials, settings.generation());

    let manager = DialogManager::new(
        screenshots,
        Arc::new(recognizer),
        Arc::new(completion),
        settings.prompts(),
    );

    let adapter = Arc::new(TelegramAdapter::new(
        settings.bot_token.clone(),
        Arc::new(manager),
    ));
    adapter.run().await;
    Ok(())
}
