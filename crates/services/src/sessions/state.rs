use std::collections::BTreeSet;

use trivia_core::model::{CategoryId, Difficulty, Preferences};

/// Lives granted at the start of every session.
pub const STARTING_LIVES: u32 = 5;

/// Parameters fixed for the lifetime of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Empty means "any category".
    pub categories: BTreeSet<CategoryId>,
    pub difficulty: Difficulty,
}

impl SessionConfig {
    #[must_use]
    pub fn new(categories: impl IntoIterator<Item = CategoryId>, difficulty: Difficulty) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            difficulty,
        }
    }

    #[must_use]
    pub fn from_preferences(preferences: &Preferences) -> Self {
        Self {
            categories: preferences.categories().clone(),
            difficulty: preferences.difficulty(),
        }
    }
}

/// Coarse engine state, for logging and driver decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// Constructed, nothing requested yet.
    Empty,
    /// Buffer empty or exhausted; `ensure_questions` is due.
    Loading,
    Active,
    /// Out of lives. Terminal until the next `start`.
    Finished,
}

/// The question currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveQuestion {
    /// Raw provider text; decode before display.
    pub prompt: String,
    /// Incorrect answers followed by the correct answer.
    pub choices: Vec<String>,
    pub score: u32,
    /// 1-based position within the buffer.
    pub position: usize,
    pub total: usize,
    pub lives: u32,
    pub correct_answer: String,
}

/// Read-only view of the engine handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameState {
    Finished { score: u32, lives: u32 },
    Loading { score: u32, lives: u32 },
    Active(ActiveQuestion),
}

impl GameState {
    #[must_use]
    pub fn score(&self) -> u32 {
        match self {
            GameState::Finished { score, .. } | GameState::Loading { score, .. } => *score,
            GameState::Active(active) => active.score,
        }
    }

    #[must_use]
    pub fn lives(&self) -> u32 {
        match self {
            GameState::Finished { lives, .. } | GameState::Loading { lives, .. } => *lives,
            GameState::Active(active) => active.lives,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, GameState::Finished { .. })
    }
}

/// Result of `ensure_questions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A question is already available; nothing was fetched.
    Ready,
    /// The buffer was replaced with this many questions.
    Fetched(usize),
    /// The fetch came back empty. Still loading; the caller may retry.
    Empty,
    /// The session is over; nothing was fetched.
    Finished,
}

/// Result of `submit_answer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Wrong { correct_answer: String },
    TimedOut { correct_answer: String },
    /// The session was finished or no question was on screen.
    Ignored,
}

impl AnswerOutcome {
    #[must_use]
    pub fn lost_life(&self) -> bool {
        matches!(
            self,
            AnswerOutcome::Wrong { .. } | AnswerOutcome::TimedOut { .. }
        )
    }
}
