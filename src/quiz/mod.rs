pub mod parser;
pub mod publisher;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_QUESTION_CHARS: usize = 300;
pub const MAX_EXPLANATION_CHARS: usize = 400;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;
pub const TRUNCATION_MARKER: &str = " [...]";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("question text is empty")]
    EmptyQuestion,
    #[error("expected at least 2 options, got {0}")]
    TooFewOptions(usize),
    #[error("expected at most 10 options, got {0}")]
    TooManyOptions(usize),
    #[error("correct option {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
    #[error("{field} is {len} characters long, more than the limit of {limit}")]
    TooLong {
        field: &'static str,
        len: usize,
        limit: usize,
    },
}

/// A single-answer quiz, ready to be sent as a Telegram quiz poll.
///
/// The only way to get one is through [`QuizRecord::new`] (or deserializing,
/// which runs the same checks), so every record in hand satisfies:
/// a non-blank question, 2 to 10 options, a correct index pointing at one
/// of them and texts within their length limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizFields")]
pub struct QuizRecord {
    question: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
}

impl QuizRecord {
    /// Trims and truncates the texts, then validates the result.
    pub fn new(
        question: &str,
        options: Vec<String>,
        correct_index: usize,
        explanation: &str,
    ) -> Result<Self, QuizError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QuizError::EmptyQuestion);
        }

        Self::checked(QuizFields {
            question: truncate_chars(question, MAX_QUESTION_CHARS),
            options,
            correct_index,
            explanation: truncate_chars(explanation.trim(), MAX_EXPLANATION_CHARS),
        })
    }

    fn checked(fields: QuizFields) -> Result<Self, QuizError> {
        if fields.question.trim().is_empty() {
            return Err(QuizError::EmptyQuestion);
        }
        check_length("question", &fields.question, MAX_QUESTION_CHARS)?;
        check_length("explanation", &fields.explanation, MAX_EXPLANATION_CHARS)?;
        let len = fields.options.len();
        if len < MIN_OPTIONS {
            return Err(QuizError::TooFewOptions(len));
        }
        if len > MAX_OPTIONS {
            return Err(QuizError::TooManyOptions(len));
        }
        if fields.correct_index >= len {
            return Err(QuizError::CorrectIndexOutOfRange {
                index: fields.correct_index,
                len,
            });
        }

        Ok(Self {
            question: fields.question,
            options: fields.options,
            correct_index: fields.correct_index,
            explanation: fields.explanation,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// Empty when the source block had no explanation.
    pub fn explanation(&self) -> &str {
        &self.explanation
    }
}

// Stored records are already normalized, so they only go through validation.
#[derive(Deserialize)]
struct QuizFields {
    question: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: String,
}

impl TryFrom<QuizFields> for QuizRecord {
    type Error = QuizError;

    fn try_from(fields: QuizFields) -> Result<Self, Self::Error> {
        Self::checked(fields)
    }
}

// A truncated text may carry the marker on top of its limit.
fn check_length(field: &'static str, text: &str, limit: usize) -> Result<(), QuizError> {
    let limit = limit + TRUNCATION_MARKER.chars().count();
    let len = text.chars().count();
    if len > limit {
        return Err(QuizError::TooLong { field, len, limit });
    }
    Ok(())
}

/// Keeps the first `limit` characters, appending [`TRUNCATION_MARKER`] if anything was cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
