// session.rs: Per-chat screenshot collection state machine.
//
// idle (no entry) → AwaitingImages → ReadyForAnalysis → AwaitingImages ...
// A session never holds more than `MAX_IMAGES` screenshots.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::screenshot::TempImage;

/// Maximum number of screenshots collected per analysis.
pub const MAX_IMAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Collecting screenshots.
    AwaitingImages,
    /// User submitted the dialog and must pick `advice` or `analyze`.
    ReadyForAnalysis,
}

/// Whether a chat can take another screenshot right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Open { collected: usize },
    Full,
    AwaitingChoice,
    Idle,
}

/// Outcome of attaching a downloaded screenshot.
/// Rejected images are handed back so the caller decides when to drop them.
#[derive(Debug)]
pub enum AddImage {
    Added { count: usize },
    Full(TempImage),
    NotCollecting(TempImage),
}

/// Outcome of the "submit dialog" trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    /// No session existed; collection has just started.
    Started,
    /// Still collecting and nothing to analyze yet.
    NoImages,
    Ready { count: usize },
    /// The choice keyboard is already pending.
    AlreadyReady { count: usize },
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    images: Vec<TempImage>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingImages,
            images: Vec::with_capacity(MAX_IMAGES),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn slot(&self) -> ImageSlot {
        match self.state {
            SessionState::ReadyForAnalysis => ImageSlot::AwaitingChoice,
            SessionState::AwaitingImages if self.images.len() >= MAX_IMAGES => ImageSlot::Full,
            SessionState::AwaitingImages => ImageSlot::Open {
                collected: self.images.len(),
            },
        }
    }

    pub fn add_image(&mut self, image: TempImage) -> AddImage {
        match self.slot() {
            ImageSlot::Open { .. } => {
                self.images.push(image);
                AddImage::Added {
                    count: self.images.len(),
                }
            }
            ImageSlot::Full => AddImage::Full(image),
            ImageSlot::AwaitingChoice | ImageSlot::Idle => AddImage::NotCollecting(image),
        }
    }

    pub fn submit(&mut self) -> Submit {
        match self.state {
            SessionState::ReadyForAnalysis => Submit::AlreadyReady {
                count: self.images.len(),
            },
            SessionState::AwaitingImages if self.images.is_empty() => Submit::NoImages,
            SessionState::AwaitingImages => {
                self.state = SessionState::ReadyForAnalysis;
                Submit::Ready {
                    count: self.images.len(),
                }
            }
        }
    }

    /// Move the screenshots out for analysis and start collecting afresh.
    /// Only allowed once the dialog has been submitted.
    pub fn take_for_analysis(&mut self) -> Option<Vec<TempImage>> {
        if self.state != SessionState::ReadyForAnalysis {
            return None;
        }
        self.state = SessionState::AwaitingImages;
        Some(std::mem::take(&mut self.images))
    }
}

/// Sessions keyed by chat id.
///
/// The lock is never held across `.await`, and dropped screenshots are
/// released after the lock so file removal happens outside it.
#[derive(Default)]
pub struct SessionStore {
    map: Mutex<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Session>> {
        self.map.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Begin (or restart) collection for a chat. Returns how many
    /// screenshots from a previous session were discarded.
    pub fn start(&self, chat_id: i64) -> usize {
        let previous = self.lock().insert(chat_id, Session::new());
        previous.map(|s| s.image_count()).unwrap_or(0)
    }

    /// Forget the chat entirely. Returns true if a session existed.
    pub fn remove(&self, chat_id: i64) -> bool {
        let removed = self.lock().remove(&chat_id);
        removed.is_some()
    }

    pub fn state(&self, chat_id: i64) -> Option<SessionState> {
        self.lock().get(&chat_id).map(Session::state)
    }

    pub fn image_count(&self, chat_id: i64) -> usize {
        self.lock().get(&chat_id).map(Session::image_count).unwrap_or(0)
    }

    pub fn slot(&self, chat_id: i64) -> ImageSlot {
        self.lock()
            .get(&chat_id)
            .map(Session::slot)
            .unwrap_or(ImageSlot::Idle)
    }

    pub fn add_image(&self, chat_id: i64, image: TempImage) -> AddImage {
        match self.lock().get_mut(&chat_id) {
            Some(session) => session.add_image(image),
            None => AddImage::NotCollecting(image),
        }
    }

    /// Handle the submit trigger; an idle chat starts collecting.
    pub fn submit(&self, chat_id: i64) -> Submit {
        let mut map = self.lock();
        match map.get_mut(&chat_id) {
            Some(session) => session.submit(),
            None => {
                map.insert(chat_id, Session::new());
                Submit::Started
            }
        }
    }

    pub fn take_for_analysis(&self, chat_id: i64) -> Option<Vec<TempImage>> {
        self.lock()
            .get_mut(&chat_id)
            .and_then(Session::take_for_analysis)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
