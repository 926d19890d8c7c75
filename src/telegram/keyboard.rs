use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};

use crate::dialog::AnalysisKind;
use crate::dialog_manager::{Keyboard, SUBMIT_BUTTON};

/// Button label shown for each analysis kind.
pub fn choice_label(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::Advice => "Что сказать?",
        AnalysisKind::Analyze => "Анализ диалога",
    }
}

/// `(label, callback_data)` pairs for the analysis choice, in display order.
pub fn choice_buttons() -> Vec<(&'static str, &'static str)> {
    AnalysisKind::ALL
        .into_iter()
        .map(|kind| (choice_label(kind), kind.callback_data()))
        .collect()
}

/// Telegram markup for a reply keyboard, if any.
pub fn render(keyboard: Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::SubmitDialog => Some(
            KeyboardMarkup::new(vec![vec![KeyboardButton::new(SUBMIT_BUTTON)]])
                .resize_keyboard()
                .into(),
        ),
        Keyboard::AnalysisChoice => Some(
            InlineKeyboardMarkup::new(vec![choice_buttons()
                .into_iter()
                .map(|(label, data)| InlineKeyboardButton::callback(label, data))
                .collect::<Vec<_>>()])
            .into(),
        ),
    }
}

/// Inbound text, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCommand {
    Start,
    Help,
    Cancel,
    Submit,
    Other,
}

/// Recognize `/start`, `/help`, `/cancel` (optionally `@botname`-suffixed)
/// and the submit button label.
pub fn parse_text(text: &str) -> TextCommand {
    let trimmed = text.trim();
    if trimmed == SUBMIT_BUTTON {
        return TextCommand::Submit;
    }
    let first = match trimmed.split_whitespace().next() {
        Some(word) if word.starts_with('/') => word,
        _ => return TextCommand::Other,
    };
    let command = first.split('@').next().unwrap_or(first);
    match command {
        "/start" => TextCommand::Start,
        "/help" => TextCommand::Help,
        "/cancel" => TextCommand::Cancel,
        _ => TextCommand::Other,
    }
}
