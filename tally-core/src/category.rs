//! Ledger category types.

use serde::{Deserialize, Serialize};

/// A category as the ledger server reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub is_group: bool,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            archived: false,
            is_group: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Canonical categories are neither archived nor group headers.
    pub fn is_active(&self) -> bool {
        !self.archived && !self.is_group
    }
}

/// The working set for a run: active categories, in ledger order.
/// Captured once at run start and treated as read-only afterwards.
pub fn active_snapshot(categories: &[Category]) -> Vec<Category> {
    categories
        .iter()
        .filter(|c| c.is_active())
        .cloned()
        .collect()
}
