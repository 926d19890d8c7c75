use serde::{Deserialize, Serialize};

/// Substitution slot every prompt template must contain.
pub const DIALOG_PLACEHOLDER: &str = "{dialog}";

pub const DEFAULT_ANALYZE_PROMPT: &str = "Действуй как опытный психолог. Проанализируй следующий диалог и дай профессиональную оценку 
взаимодействию между собеседниками, их намерениям и чувствам:

{dialog}

Предоставь развернутый анализ.";

pub const DEFAULT_ADVICE_PROMPT: &str = "Действуй как опытный психолог. Прочитай следующий диалог и посоветуй, как лучше всего 
ответить дальше, чтобы улучшить коммуникацию и достичь положительного результата:

{dialog}

Дай конкретный совет, что написать дальше.";

/// Which kind of answer the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// "What should I say next?"
    Advice,
    /// Psychological analysis of the whole conversation.
    Analyze,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 2] = [AnalysisKind::Advice, AnalysisKind::Analyze];

    /// Callback payload carried by the inline keyboard button.
    pub fn callback_data(self) -> &'static str {
        match self {
            AnalysisKind::Advice => "advice",
            AnalysisKind::Analyze => "analyze",
        }
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.callback_data() == data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("transcript is empty")]
    EmptyTranscript,
    #[error("{0} prompt has no {{dialog}} placeholder")]
    MissingPlaceholder(&'static str),
}

/// The two prompt templates, each with a single `{dialog}` slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplates {
    pub advice: String,
    pub analyze: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            advice: DEFAULT_ADVICE_PROMPT.into(),
            analyze: DEFAULT_ANALYZE_PROMPT.into(),
        }
    }
}

impl PromptTemplates {
    pub fn new(advice: impl Into<String>, analyze: impl Into<String>) -> Result<Self, PromptError> {
        let templates = Self {
            advice: advice.into(),
            analyze: analyze.into(),
        };
        templates.validate()?;
        Ok(templates)
    }

    pub fn validate(&self) -> Result<(), PromptError> {
        if !self.advice.contains(DIALOG_PLACEHOLDER) {
            return Err(PromptError::MissingPlaceholder("advice"));
        }
        if !self.analyze.contains(DIALOG_PLACEHOLDER) {
            return Err(PromptError::MissingPlaceholder("analyze"));
        }
        Ok(())
    }

    pub fn template(&self, kind: AnalysisKind) -> &str {
        match kind {
            AnalysisKind::Advice => &self.advice,
            AnalysisKind::Analyze => &self.analyze,
        }
    }

    /// Fill the template for `kind` with `transcript`.
    pub fn build(&self, kind: AnalysisKind, transcript: &str) -> Result<String, PromptError> {
        if transcript.trim().is_empty() {
            return Err(PromptError::EmptyTranscript);
        }
        Ok(self.template(kind).replace(DIALOG_PLACEHOLDER, transcript))
    }
}
