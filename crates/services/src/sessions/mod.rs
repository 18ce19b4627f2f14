mod engine;
mod state;

// Public API of the game session subsystem.
pub use engine::GameEngine;
pub use state::{
    ActiveQuestion, AnswerOutcome, EnginePhase, EnsureOutcome, GameState, STARTING_LIVES,
    SessionConfig,
};
