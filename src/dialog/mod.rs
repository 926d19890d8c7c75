//! Turning recognized screenshot text into a prompt: the speaker-labeling
//! heuristic and the two prompt templates.

pub mod format;
pub mod prompt;

pub use format::{format_dialog, DEFAULT_SPEAKER};
pub use prompt::{AnalysisKind, PromptError, PromptTemplates, DIALOG_PLACEHOLDER};
