#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod preferences_service;
pub mod sessions;
pub mod source;

#[cfg(test)]
mod test_harness;

pub use app_services::AppServices;
pub use error::{AppServicesError, PreferencesServiceError, ProviderConfigError, SourceError};
pub use preferences_service::PreferencesService;
pub use sessions::{
    ActiveQuestion, AnswerOutcome, EnginePhase, EnsureOutcome, GameEngine, GameState,
    STARTING_LIVES, SessionConfig,
};
pub use source::{
    BatchRequest, DEFAULT_BATCH_AMOUNT, DEFAULT_REQUEST_SPACING, FetchObserver, FetchSettings,
    NoopObserver, OpenTdbClient, ProviderConfig, QuestionFetcher, QuestionSource, RequestPacer,
    ZeroResultFallback,
};
pub use trivia_core::model::answers_match;
