//! Question Source Adapter: the seam between the game engine and a remote
//! question bank.

use async_trait::async_trait;

use trivia_core::model::{Category, CategoryId, Difficulty, Question, SessionToken};

use crate::error::SourceError;

mod fetcher;
mod open_tdb;

pub use fetcher::{
    DEFAULT_BATCH_AMOUNT, DEFAULT_REQUEST_SPACING, FetchObserver, FetchSettings, NoopObserver,
    QuestionFetcher, RequestPacer, ZeroResultFallback,
};
pub use open_tdb::{DEFAULT_BASE_URL, OpenTdbClient, ProviderConfig, ResponseCode};

/// Parameters of a single provider request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// `None` asks for questions from any category.
    pub category: Option<CategoryId>,
    pub difficulty: Difficulty,
    pub amount: u32,
    pub token: Option<SessionToken>,
}

/// Contract for a remote trivia question provider.
///
/// One method call maps to one provider request; pacing between requests is
/// the caller's job (see [`QuestionFetcher`]).
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Request a fresh session token.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` when the provider cannot be reached or refuses to
    /// issue a token.
    async fn request_token(&self) -> Result<SessionToken, SourceError>;

    /// Fetch one batch of questions.
    ///
    /// A category with no matching questions yields `Ok` with an empty list.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` when the request cannot complete.
    async fn fetch_batch(&self, request: &BatchRequest) -> Result<Vec<Question>, SourceError>;

    /// List the categories the provider offers.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` when the request cannot complete.
    async fn list_categories(&self) -> Result<Vec<Category>, SourceError>;
}
