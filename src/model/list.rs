use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::Item;
use super::text::ListName;

/// A named, ordered collection of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    pub id: String,
    pub name: String,
    /// Items in insertion order (stored as `todos` on disk)
    #[serde(rename = "todos", default)]
    pub items: Vec<Item>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoList {
    pub fn new(id: String, name: ListName, now: DateTime<Utc>) -> Self {
        TodoList {
            id,
            name: name.into_inner(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|i| i.completed).count()
    }

    /// Fraction of completed items, 0.0 for an empty list
    pub fn progress(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.items.len() as f64
    }

    /// Merge a patch into this list and bump `updated_at`
    pub fn apply(&mut self, patch: ListPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name.into_inner();
        }
        self.updated_at = now;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Partial update for a list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPatch {
    pub name: Option<ListName>,
}

impl ListPatch {
    pub fn rename(name: ListName) -> Self {
        ListPatch { name: Some(name) }
    }
}
