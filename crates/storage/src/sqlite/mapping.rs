use trivia_core::model::{CategoryId, Difficulty};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Categories are stored as a comma-separated list of ids, e.g. `9,17,21`.
pub(crate) fn encode_categories<'a>(ids: impl IntoIterator<Item = &'a CategoryId>) -> String {
    ids.into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn decode_categories(raw: &str) -> Result<Vec<CategoryId>, StorageError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<CategoryId>().map_err(ser))
        .collect()
}

pub(crate) fn parse_difficulty(raw: &str) -> Result<Difficulty, StorageError> {
    raw.parse::<Difficulty>().map_err(ser)
}
