//! Generation client for code reviews.
//!
//! [`Generator`] is the seam the HTTP layer talks to; [`GeminiClient`] is the
//! production implementation backed by Google's `generateContent` API.

mod error;
mod gemini;
mod instruction;
mod text;

use async_trait::async_trait;

pub use error::GenerationError;
pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use instruction::{SystemInstruction, REFUSAL_MESSAGE};
pub use text::truncate_utf8;

/// Result of a generation call that reached the provider and got an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Provider produced text; returned verbatim.
    Text(String),
    /// Provider answered successfully but produced no text.
    Empty,
}

impl GenerationOutcome {
    pub fn from_text(text: String) -> Self {
        if text.is_empty() {
            GenerationOutcome::Empty
        } else {
            GenerationOutcome::Text(text)
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            GenerationOutcome::Text(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Short label used in logs.
    fn backend(&self) -> &str;

    /// Issue exactly one provider call. No retries, no caching.
    async fn generate(
        &self,
        instruction: SystemInstruction,
        input: &str,
    ) -> Result<GenerationOutcome, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_empty_outcome() {
        assert_eq!(
            GenerationOutcome::from_text(String::new()),
            GenerationOutcome::Empty
        );
        assert_eq!(
            GenerationOutcome::from_text(" ".into()),
            GenerationOutcome::Text(" ".into())
        );
    }

    #[test]
    fn into_text_rejects_empty() {
        assert_eq!(GenerationOutcome::Empty.into_text(), None);
        assert_eq!(GenerationOutcome::Text(String::new()).into_text(), None);
        assert_eq!(
            GenerationOutcome::Text("ok".into()).into_text().as_deref(),
            Some("ok")
        );
    }
}
