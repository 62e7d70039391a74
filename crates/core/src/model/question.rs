use serde::{Deserialize, Serialize};
use std::fmt;

/// A generated practice question.
///
/// Only the fields the controller needs are modelled; presentation data stays
/// with whatever produced the question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    content: String,
    correct_answer: String,
}

impl Question {
    #[must_use]
    pub fn new(content: impl Into<String>, correct_answer: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            correct_answer: correct_answer.into(),
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn signature(&self) -> QuestionSignature {
        signature_of(self)
    }
}

/// Identity of a question instance for repetition tracking: `content_answer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionSignature(String);

impl QuestionSignature {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signature of `question`. Independently generated questions with the same
/// content and answer share a signature.
#[must_use]
pub fn signature_of(question: &Question) -> QuestionSignature {
    QuestionSignature(format!(
        "{}_{}",
        question.content(),
        question.correct_answer()
    ))
}
