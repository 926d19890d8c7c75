/// The `capture` module collects dialog screenshots sent to the bot:
/// temporary file ownership lives in `screenshot`, the per-chat collection
/// state machine in `session`.
pub mod screenshot;
pub mod session;

pub use screenshot::{check_image, prepare_for_ocr, OcrImage, ScreenshotDir, TempImage};
pub use session::{AddImage, ImageSlot, Session, SessionState, SessionStore, Submit, MAX_IMAGES};
