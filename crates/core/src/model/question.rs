use std::borrow::Cow;

use thiserror::Error;

use crate::model::Difficulty;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("correct answer cannot be empty")]
    EmptyCorrectAnswer,

    #[error("incorrect answer #{index} is empty")]
    EmptyIncorrectAnswer { index: usize },

    #[error("correct answer also appears among the incorrect answers")]
    CorrectAnswerAmongIncorrect,
}

//
// ─── ANSWER MATCHING ───────────────────────────────────────────────────────────
//

/// Compares two answer texts the way the game scores them: trimmed and case-insensitive.
#[must_use]
pub fn answers_match(given: &str, expected: &str) -> bool {
    given.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Decodes HTML entities for display. Provider text is stored raw.
#[must_use]
pub fn decode_html(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as received from a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
    pub category: Option<String>,
    pub difficulty: Difficulty,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
        incorrect_answers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            correct_answer: correct_answer.into(),
            incorrect_answers: incorrect_answers.into_iter().map(Into::into).collect(),
            category: None,
            difficulty: Difficulty::Any,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Validate the draft into an immutable `Question`.
    ///
    /// Texts are kept raw; no entity decoding happens here.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt or an answer is blank, or if the
    /// correct answer is also listed as incorrect.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if self.correct_answer.trim().is_empty() {
            return Err(QuestionError::EmptyCorrectAnswer);
        }
        if let Some(index) = self
            .incorrect_answers
            .iter()
            .position(|answer| answer.trim().is_empty())
        {
            return Err(QuestionError::EmptyIncorrectAnswer { index });
        }
        if self
            .incorrect_answers
            .iter()
            .any(|answer| answers_match(answer, &self.correct_answer))
        {
            return Err(QuestionError::CorrectAnswerAmongIncorrect);
        }

        Ok(Question {
            prompt: self.prompt,
            correct_answer: self.correct_answer,
            incorrect_answers: self.incorrect_answers,
            category: self.category,
            difficulty: self.difficulty,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One multiple-choice trivia item.
///
/// Immutable once built. Texts are raw provider values and may contain HTML
/// entities; use [`Question::display_prompt`] or [`decode_html`] for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    prompt: String,
    correct_answer: String,
    incorrect_answers: Vec<String>,
    category: Option<String>,
    difficulty: Difficulty,
}

impl Question {
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn display_prompt(&self) -> Cow<'_, str> {
        decode_html(&self.prompt)
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn incorrect_answers(&self) -> &[String] {
        &self.incorrect_answers
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Incorrect answers followed by the correct answer, in that fixed order.
    #[must_use]
    pub fn choices(&self) -> Vec<String> {
        let mut choices = Vec::with_capacity(self.incorrect_answers.len() + 1);
        choices.extend(self.incorrect_answers.iter().cloned());
        choices.push(self.correct_answer.clone());
        choices
    }

    #[must_use]
    pub fn is_correct(&self, given: &str) -> bool {
        answers_match(given, &self.correct_answer)
    }
}
