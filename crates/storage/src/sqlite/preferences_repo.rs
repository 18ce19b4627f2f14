use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{PreferencesRepository, StorageError};
use trivia_core::model::Preferences;

use super::SqliteRepository;
use super::mapping::{decode_categories, encode_categories, parse_difficulty};

#[async_trait]
impl PreferencesRepository for SqliteRepository {
    async fn get_preferences(&self) -> Result<Option<Preferences>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT categories, difficulty
            FROM preferences
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let categories: String = row
            .try_get("categories")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let difficulty: String = row
            .try_get("difficulty")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        Ok(Some(Preferences::from_persisted(
            decode_categories(&categories)?,
            parse_difficulty(&difficulty)?,
        )))
    }

    async fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO preferences (id, categories, difficulty, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                categories = excluded.categories,
                difficulty = excluded.difficulty,
                updated_at = excluded.updated_at
            ",
        )
        .bind(1_i64)
        .bind(encode_categories(preferences.categories()))
        .bind(preferences.difficulty().as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
