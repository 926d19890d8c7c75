use super::{AiError, CompletionProvider};

/// Reply sent when the provider answered with zero alternatives.
pub const NO_ALTERNATIVES_FALLBACK: &str = "Извините, не удалось сгенерировать ответ.";

/// Reply sent when the completion call itself failed.
pub const PROVIDER_FAILURE_FALLBACK: &str =
    "Произошла ошибка при обработке запроса. Пожалуйста, попробуйте позже.";

/// Result of one completion round-trip. Every variant maps to user-facing text.
#[derive(Debug)]
pub enum Completion {
    Generated(String),
    Empty,
    Failed(AiError),
}

impl Completion {
    /// Text to send back to the user.
    pub fn reply_text(&self) -> &str {
        match self {
            Completion::Generated(text) => text,
            Completion::Empty => NO_ALTERNATIVES_FALLBACK,
            Completion::Failed(_) => PROVIDER_FAILURE_FALLBACK,
        }
    }

    pub fn into_reply_text(self) -> String {
        match self {
            Completion::Generated(text) => text,
            other => other.reply_text().to_string(),
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Completion::Generated(_))
    }
}

/// Ask the provider for a completion. Never fails: provider errors become
/// `Completion::Failed`, an empty answer becomes `Completion::Empty`.
pub async fn generate_response(provider: &dyn CompletionProvider, prompt: &str) -> Completion {
    log::info!(
        "Generating response with {} ({} chars of prompt)",
        provider.name(),
        prompt.chars().count()
    );
    match provider.complete(prompt).await {
        Ok(alternatives) => match alternatives.into_iter().next() {
            Some(first) => {
                log::info!("Generated response ({} chars)", first.text.chars().count());
                Completion::Generated(first.text)
            }
            None => {
                log::warn!("No response generated");
                Completion::Empty
            }
        },
        Err(e) => {
            log::error!("Error generating response: {}", e);
            Completion::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Alternative;
    use async_trait::async_trait;

    enum Canned {
        Texts(Vec<&'static str>),
        Fail,
    }

    #[async_trait]
    impl CompletionProvider for Canned {
        async fn complete(&self, _prompt: &str) -> Result<Vec<Alternative>, AiError> {
            match self {
                Canned::Texts(texts) => Ok(texts
                    .iter()
                    .map(|t| Alternative {
                        text: t.to_string(),
                        status: "ALTERNATIVE_STATUS_FINAL".into(),
                    })
                    .collect()),
                Canned::Fail => Err(AiError::ConnectionError("boom".into())),
            }
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn first_alternative_wins() {
        let c = generate_response(&Canned::Texts(vec!["first", "second"]), "p").await;
        assert!(c.is_generated());
        assert_eq!(c.reply_text(), "first");
        assert_eq!(c.into_reply_text(), "first");
    }

    #[tokio::test]
    async fn zero_alternatives_gives_fixed_fallback() {
        let c = generate_response(&Canned::Texts(vec![]), "p").await;
        assert!(matches!(c, Completion::Empty));
        assert_eq!(c.into_reply_text(), "Извините, не удалось сгенерировать ответ.");
    }

    #[tokio::test]
    async fn provider_error_is_swallowed() {
        let c = generate_response(&Canned::Fail, "p").await;
        match &c {
            Completion::Failed(AiError::ConnectionError(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(
            c.reply_text(),
            "Произошла ошибка при обработке запроса. Пожалуйста, попробуйте позже."
        );
    }

    #[tokio::test]
    async fn empty_text_alternative_is_still_generated() {
        let c = generate_response(&Canned::Texts(vec![""]), "p").await;
        assert!(c.is_generated());
        assert_eq!(c.reply_text(), "");
    }
}
