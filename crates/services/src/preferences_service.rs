use std::sync::Arc;

use storage::repository::PreferencesRepository;
use trivia_core::model::{Preferences, PreferencesDraft};
use tracing::debug;

use crate::error::PreferencesServiceError;

#[derive(Clone)]
pub struct PreferencesService {
    repo: Arc<dyn PreferencesRepository>,
}

impl PreferencesService {
    #[must_use]
    pub fn new(repo: Arc<dyn PreferencesRepository>) -> Self {
        Self { repo }
    }

    /// Load persisted preferences (or defaults if missing).
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError` on storage failures.
    pub async fn load(&self) -> Result<Preferences, PreferencesServiceError> {
        let preferences = self.repo.get_preferences().await?;
        Ok(preferences.unwrap_or_default())
    }

    /// Normalize and persist new preferences.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError` if persistence fails.
    pub async fn save(
        &self,
        draft: PreferencesDraft,
    ) -> Result<Preferences, PreferencesServiceError> {
        let preferences = draft.validate();
        self.repo.save_preferences(&preferences).await?;
        debug!(
            categories = preferences.categories().len(),
            difficulty = %preferences.difficulty(),
            "preferences saved"
        );
        Ok(preferences)
    }
}
