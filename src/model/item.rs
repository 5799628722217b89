use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text::ItemText;

/// A single actionable entry within a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Opaque id, unique within the owning list. Empty means "not yet assigned".
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Create an open item with both timestamps set to `now`
    pub fn new(id: String, text: ItemText, now: DateTime<Utc>) -> Self {
        Item {
            id,
            text: text.into_inner(),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a patch into this item and bump `updated_at`
    pub fn apply(&mut self, patch: ItemPatch, now: DateTime<Utc>) {
        if let Some(text) = patch.text {
            self.text = text.into_inner();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.updated_at = now;
    }
}

/// Partial update for an item. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub text: Option<ItemText>,
    pub completed: Option<bool>,
}

impl ItemPatch {
    pub fn text(text: ItemText) -> Self {
        ItemPatch {
            text: Some(text),
            completed: None,
        }
    }

    pub fn completed(completed: bool) -> Self {
        ItemPatch {
            text: None,
            completed: Some(completed),
        }
    }
}
