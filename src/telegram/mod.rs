//! Telegram transport: long polling via teloxide, routing of commands, photos
//! and inline button presses to the [`DialogManager`], and reply rendering.

mod delivery;
mod keyboard;

pub use delivery::{chunk_message, TELEGRAM_MAX_LEN};
pub use keyboard::{choice_buttons, parse_text, render, TextCommand};

use std::sync::Arc;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileMeta};
use tokio::io::AsyncWriteExt;

use crate::capture::{check_image, TempImage};
use crate::dialog_manager::{DialogManager, Reply};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
    #[error("file download failed: {0}")]
    Download(#[from] teloxide::DownloadError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Telegram front-end for the dialog pipeline.
pub struct TelegramAdapter {
    bot: Bot,
    manager: Arc<DialogManager>,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>, manager: Arc<DialogManager>) -> Self {
        Self {
            bot: Bot::new(token),
            manager,
        }
    }

    /// Run long polling until Ctrl+C.
    ///
    /// The dispatcher handles updates from one chat sequentially and from
    /// different chats concurrently.
    pub async fn run(self: Arc<Self>) {
        log::info!("Starting Telegram long polling");

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handle_message))
            .branch(Update::filter_callback_query().endpoint(handle_callback));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![Arc::clone(&self)])
            .default_handler(|upd| async move {
                log::debug!("Unhandled update {}", upd.id.0);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        log::info!("Telegram long polling stopped");
    }

    /// Send a reply, splitting long text; the keyboard rides on the last chunk.
    async fn send_reply(&self, chat_id: ChatId, reply: Reply) -> Result<(), TransportError> {
        let chunks = chunk_message(&reply.text);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let request = self.bot.send_message(chat_id, chunk);
            match keyboard::render(reply.keyboard) {
                Some(markup) if i == last => request.reply_markup(markup).await?,
                _ => request.await?,
            };
        }
        Ok(())
    }

    /// Log-and-continue wrapper; a failed send never aborts a handler.
    async fn reply(&self, chat_id: ChatId, reply: Reply) {
        if let Err(e) = self.send_reply(chat_id, reply).await {
            log::error!("Chat {}: failed to send reply: {}", chat_id.0, e);
        }
    }

    /// Download a Telegram file into the reserved screenshot path.
    async fn download(&self, file: &FileMeta, image: &TempImage) -> Result<(), TransportError> {
        let file = self.bot.get_file(file.id.clone()).await?;
        let mut dst = tokio::fs::File::create(image.path()).await?;
        self.bot.download_file(&file.path, &mut dst).await?;
        dst.flush().await?;
        Ok(())
    }

    async fn handle_image(&self, chat_id: ChatId, file: &FileMeta, extension: &str) {
        let image = match self.manager.reserve_image(chat_id.0, extension) {
            Ok(image) => image,
            Err(reply) => return self.reply(chat_id, reply).await,
        };

        log::info!(
            "Chat {}: saving screenshot to {}",
            chat_id.0,
            image.path().display()
        );
        let reply = match self.download(file, &image).await {
            Ok(()) => match check_image(image.path()) {
                Ok(format) => {
                    log::debug!("Chat {}: screenshot is {:?}", chat_id.0, format);
                    self.manager.attach_image(chat_id.0, image)
                }
                Err(e) => self.manager.unsupported_image(chat_id.0, image, &e),
            },
            Err(e) => self.manager.image_failed(chat_id.0, image, &e),
        };
        self.reply(chat_id, reply).await;
    }

    async fn handle_text(&self, chat_id: ChatId, text: &str) {
        let reply = match parse_text(text) {
            TextCommand::Start => self.manager.start(chat_id.0),
            TextCommand::Help => self.manager.help(),
            TextCommand::Cancel => self.manager.cancel(chat_id.0),
            TextCommand::Submit => self.manager.submit(chat_id.0),
            TextCommand::Other => self.manager.unknown_input(chat_id.0),
        };
        self.reply(chat_id, reply).await;
    }

    async fn handle_choice(&self, chat_id: ChatId, data: &str) {
        match self.manager.begin_analysis(chat_id.0, data) {
            Ok((notice, pending)) => {
                self.reply(chat_id, notice).await;
                let result = self.manager.run_analysis(pending).await;
                self.reply(chat_id, result).await;
            }
            Err(reply) => self.reply(chat_id, reply).await,
        }
    }
}

/// Pick the screenshot carried by a message: the largest photo size, or an
/// image sent as a document (uncompressed).
fn screenshot_file(msg: &Message) -> Option<(&FileMeta, &'static str)> {
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some((&photo.file, "jpg"));
    }
    let doc = msg.document()?;
    let extension = image_extension(doc.mime_type.as_ref()?)?;
    Some((&doc.file, extension))
}

/// File extension for an image document; `None` for anything that is not
/// an image. The extension is only cosmetic, the OCR client sniffs content.
fn image_extension(mime: &mime::Mime) -> Option<&'static str> {
    if mime.type_() != mime::IMAGE {
        return None;
    }
    let extension = match mime.subtype().as_str() {
        "png" => "png",
        "webp" => "webp",
        "jpeg" | "jpg" => "jpg",
        _ => "img",
    };
    Some(extension)
}

/// Teloxide handler for incoming messages.
async fn handle_message(msg: Message, adapter: Arc<TelegramAdapter>) -> HandlerResult {
    let chat_id = msg.chat.id;

    if let Some((file, extension)) = screenshot_file(&msg) {
        adapter.handle_image(chat_id, file, extension).await;
    } else if let Some(text) = msg.text() {
        adapter.handle_text(chat_id, text).await;
    } else {
        log::debug!("Chat {}: ignoring unsupported message kind", chat_id.0);
    }
    Ok(())
}

/// Teloxide handler for callback queries (inline keyboard presses).
async fn handle_callback(q: CallbackQuery, adapter: Arc<TelegramAdapter>) -> HandlerResult {
    // Dismiss the loading indicator first; analysis can take a while.
    if let Err(e) = adapter.bot.answer_callback_query(q.id.clone()).await {
        log::warn!("Failed to answer callback query: {}", e);
    }

    let chat_id = match q.message.as_ref() {
        Some(m) => m.chat().id,
        // Old message no longer available; the user's private chat id works too.
        None => ChatId(q.from.id.0 as i64),
    };

    match q.data.as_deref() {
        Some(data) => {
            log::debug!("Chat {}: callback {:?}", chat_id.0, data);
            adapter.handle_choice(chat_id, data).await;
        }
        None => log::debug!("Chat {}: callback without data", chat_id.0),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> mime::Mime {
        s.parse().unwrap()
    }

    #[test]
    fn common_image_types_keep_their_extension() {
        assert_eq!(image_extension(&mime::IMAGE_PNG), Some("png"));
        assert_eq!(image_extension(&mime::IMAGE_JPEG), Some("jpg"));
        assert_eq!(image_extension(&parse("image/webp")), Some("webp"));
        assert_eq!(image_extension(&parse("image/jpg")), Some("jpg"));
    }

    #[test]
    fn unknown_image_subtype_is_still_accepted() {
        assert_eq!(image_extension(&parse("image/heic")), Some("img"));
        assert_eq!(image_extension(&mime::IMAGE_SVG), Some("img"));
    }

    #[test]
    fn non_image_documents_are_ignored() {
        assert_eq!(image_extension(&mime::APPLICATION_PDF), None);
        assert_eq!(image_extension(&mime::TEXT_PLAIN), None);
        assert_eq!(image_extension(&parse("video/mp4")), None);
    }
}
