use std::sync::Arc;

use storage::repository::Storage;
use trivia_core::model::Category;
use tracing::warn;

use crate::error::AppServicesError;
use crate::preferences_service::PreferencesService;
use crate::sessions::GameEngine;
use crate::source::{FetchSettings, OpenTdbClient, ProviderConfig, QuestionSource};

/// Assembles app-facing services: preferences storage and the question provider.
#[derive(Clone)]
pub struct AppServices {
    preferences: Arc<PreferencesService>,
    source: Arc<dyn QuestionSource>,
    fetch: FetchSettings,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the configured provider.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// provider configuration is invalid.
    pub async fn new_sqlite(
        db_url: &str,
        provider: ProviderConfig,
        fetch: FetchSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let source: Arc<dyn QuestionSource> = Arc::new(OpenTdbClient::new(provider)?);
        Ok(Self::from_parts(storage, source, fetch))
    }

    /// Build services from already constructed parts.
    #[must_use]
    pub fn from_parts(
        storage: Storage,
        source: Arc<dyn QuestionSource>,
        fetch: FetchSettings,
    ) -> Self {
        Self {
            preferences: Arc::new(PreferencesService::new(Arc::clone(&storage.preferences))),
            source,
            fetch,
        }
    }

    #[must_use]
    pub fn preferences(&self) -> Arc<PreferencesService> {
        Arc::clone(&self.preferences)
    }

    #[must_use]
    pub fn source(&self) -> Arc<dyn QuestionSource> {
        Arc::clone(&self.source)
    }

    /// A fresh engine bound to the provider. Call `start` before playing.
    #[must_use]
    pub fn new_engine(&self) -> GameEngine {
        GameEngine::new(self.source(), self.fetch.clone())
    }

    /// Categories offered by the provider; empty when it cannot be reached.
    pub async fn categories(&self) -> Vec<Category> {
        match self.source.list_categories().await {
            Ok(categories) => categories,
            Err(err) => {
                warn!(error = %err, "category list unavailable");
                Vec::new()
            }
        }
    }
}
