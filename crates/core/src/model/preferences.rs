use std::collections::BTreeSet;

use crate::model::{CategoryId, Difficulty};

/// Player choices remembered between runs.
///
/// An empty category set means "any category".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preferences {
    categories: BTreeSet<CategoryId>,
    difficulty: Difficulty,
}

#[derive(Clone, Debug, Default)]
pub struct PreferencesDraft {
    pub categories: Vec<CategoryId>,
    pub difficulty: Difficulty,
}

impl PreferencesDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the draft into persisted preferences. Duplicate ids collapse.
    #[must_use]
    pub fn validate(self) -> Preferences {
        Preferences {
            categories: self.categories.into_iter().collect(),
            difficulty: self.difficulty,
        }
    }
}

impl Preferences {
    #[must_use]
    pub fn from_persisted(categories: Vec<CategoryId>, difficulty: Difficulty) -> Self {
        PreferencesDraft {
            categories,
            difficulty,
        }
        .validate()
    }

    #[must_use]
    pub fn categories(&self) -> &BTreeSet<CategoryId> {
        &self.categories
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn is_selected(&self, id: CategoryId) -> bool {
        self.categories.contains(&id)
    }

    /// Flip a category in or out of the selection. Returns whether it is now selected.
    pub fn toggle_category(&mut self, id: CategoryId) -> bool {
        if self.categories.remove(&id) {
            false
        } else {
            self.categories.insert(id);
            true
        }
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    /// Draft carrying the current values, for persisting edits.
    #[must_use]
    pub fn to_draft(&self) -> PreferencesDraft {
        PreferencesDraft {
            categories: self.categories.iter().copied().collect(),
            difficulty: self.difficulty,
        }
    }
}
