mod category;
mod difficulty;
mod ids;
mod preferences;
mod question;
mod token;

pub use category::Category;
pub use difficulty::{Difficulty, DifficultyParseError};
pub use ids::{CategoryId, ParseIdError};
pub use preferences::{Preferences, PreferencesDraft};
pub use question::{Question, QuestionDraft, QuestionError, answers_match, decode_html};
pub use token::SessionToken;
