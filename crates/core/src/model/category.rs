use serde::{Deserialize, Serialize};

use crate::model::CategoryId;

/// A category as listed by the question provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    #[must_use]
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Label for menus, falling back to the numeric id for unknown categories.
    #[must_use]
    pub fn label_for(categories: &[Category], id: CategoryId) -> String {
        categories
            .iter()
            .find(|category| category.id == id)
            .map_or_else(|| format!("Category {id}"), |category| category.name.clone())
    }
}
