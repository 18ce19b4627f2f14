//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by a `QuestionSource`.
///
/// The game engine never surfaces these: a failed request counts as a request
/// that returned no questions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("question provider unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("question provider returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("question provider rejected the request (response code {code})")]
    Provider { code: u8 },
    #[error("question provider did not issue a session token")]
    MissingToken,
    #[error("question provider payload is malformed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors emitted while resolving provider configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderConfigError {
    #[error("invalid provider base URL: {raw}")]
    InvalidBaseUrl { raw: String },
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// Errors emitted by `PreferencesService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreferencesServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Provider(#[from] ProviderConfigError),
}
