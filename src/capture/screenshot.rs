// screenshot.rs: Temporary storage for dialog screenshots received from chat.
// Each file is owned by exactly one `TempImage`; dropping it deletes the file.
// Also normalizes image bytes into a format the OCR service accepts.

use image::codecs::jpeg::JpegEncoder;
use image::error::{ImageFormatHint, UnsupportedError, UnsupportedErrorKind};
use image::{GenericImageView, ImageError, ImageFormat};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

// ── TempImage ───────────────────────────────────────────────────────────
/// A screenshot persisted on local disk for the lifetime of one session.
///
/// The file may not exist yet (a download in progress) or may already be
/// gone; removal on drop tolerates both.
#[derive(Debug, PartialEq, Eq)]
pub struct TempImage {
    path: PathBuf,
}

impl TempImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temporary file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to remove temporary file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

// ── ScreenshotDir ───────────────────────────────────────────────────────
/// Directory that hands out unique file names for incoming screenshots.
pub struct ScreenshotDir {
    root: PathBuf,
    next_seq: AtomicU64,
}

impl ScreenshotDir {
    /// Create the directory (and parents) if needed and remove screenshots
    /// left behind by a previous run.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let removed = remove_leftovers(&root)?;
        if removed > 0 {
            log::info!("Removed {} leftover screenshot(s) from {}", removed, root.display());
        }
        log::info!("Screenshots are stored in {}", root.display());
        Ok(Self {
            root,
            next_seq: AtomicU64::new(1),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a fresh path for a screenshot of `chat_id`.
    /// The returned `TempImage` owns the path even before anything is written.
    pub fn allocate(&self, chat_id: i64, extension: &str) -> TempImage {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let name = format!("chat{}_{}.{}", chat_id, seq, extension.trim_start_matches('.'));
        TempImage::new(self.root.join(name))
    }
}

/// Names produced by `allocate` look like `chat<id>_<seq>.<ext>`.
fn is_screenshot_name(name: &str) -> bool {
    name.strip_prefix("chat")
        .and_then(|rest| rest.split_once('_'))
        .map_or(false, |(id, _)| id.parse::<i64>().is_ok())
}

fn remove_leftovers(root: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let is_leftover = entry.file_type()?.is_file()
            && entry.file_name().to_str().map_or(false, is_screenshot_name);
        if !is_leftover {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("Failed to remove {}: {}", entry.path().display(), e),
        }
    }
    Ok(removed)
}

// ── OCR normalization ───────────────────────────────────────────────────
/// Image bytes in a format accepted by the recognition service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrImage {
    /// `"JPEG"` or `"PNG"`
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

/// Check that a downloaded screenshot is an image `image` can decode, so
/// HEIC, SVG and similar uploads are refused before analysis.
pub fn check_image(path: &Path) -> Result<ImageFormat, ImageError> {
    let data = std::fs::read(path)?;
    let format = image::guess_format(&data)?;
    if !format.reading_enabled() {
        let hint = ImageFormatHint::Exact(format);
        return Err(ImageError::Unsupported(UnsupportedError::from_format_and_kind(
            hint.clone(),
            UnsupportedErrorKind::Format(hint),
        )));
    }
    Ok(format)
}

/// JPEG and PNG pass through untouched; anything else `image` can decode
/// (WebP, BMP, GIF, ...) is re-encoded as JPEG.
pub fn prepare_for_ocr(data: Vec<u8>, jpeg_quality: u8) -> Result<OcrImage, image::ImageError> {
    match image::guess_format(&data)? {
        ImageFormat::Jpeg => Ok(OcrImage {
            mime_type: "JPEG",
            data,
        }),
        ImageFormat::Png => Ok(OcrImage {
            mime_type: "PNG",
            data,
        }),
        other => {
            log::debug!("Re-encoding {:?} screenshot as JPEG", other);
            let img = image::load_from_memory(&data)?;
            let (w, h) = img.dimensions();

            let mut jpeg_buf: Vec<u8> = Vec::new();
            let mut encoder = JpegEncoder::new_with_quality(&mut jpeg_buf, jpeg_quality);
            encoder.encode(img.to_rgb8().as_raw(), w, h, image::ExtendedColorType::Rgb8)?;

            Ok(OcrImage {
                mime_type: "JPEG",
                data: jpeg_buf,
            })
        }
    }
}
