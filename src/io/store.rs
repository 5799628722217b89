use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::io::kv::KeyValueStore;
use crate::model::list::TodoList;

/// Storage key for the list collection
pub const LISTS_KEY: &str = "ai_todo_lists";

/// Current on-disk format version of the list collection
pub const LISTS_VERSION: u32 = 1;

/// Error decoding a persisted structure
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("missing format version")]
    MissingVersion,
}

#[derive(Serialize)]
struct ListsEnvelope<'a> {
    version: u32,
    lists: &'a [TodoList],
}

#[derive(Deserialize)]
struct ListsBody {
    lists: Vec<TodoList>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: Option<u32>,
}

/// A persisted blob sorted by format: the current versioned envelope, or the
/// bare array written before versioning existed.
pub(crate) enum Stored {
    Current(Value),
    Legacy(Value),
}

/// Read only the format version of `raw`, so a newer file is reported as
/// such even when its body would no longer parse.
pub(crate) fn read_format(raw: &str, current: u32) -> Result<Stored, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    if value.is_array() {
        return Ok(Stored::Legacy(value));
    }
    match VersionHeader::deserialize(&value)?.version {
        Some(version) if version == current => Ok(Stored::Current(value)),
        Some(version) => Err(DecodeError::UnsupportedVersion(version)),
        None => Err(DecodeError::MissingVersion),
    }
}

/// Serialize the collection to its wire form
pub fn encode_lists(lists: &[TodoList]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ListsEnvelope {
        version: LISTS_VERSION,
        lists,
    })
}

/// Parse the wire form, migrating the legacy layout
pub fn decode_lists(raw: &str) -> Result<Vec<TodoList>, DecodeError> {
    match read_format(raw, LISTS_VERSION)? {
        Stored::Current(value) => Ok(ListsBody::deserialize(value)?.lists),
        Stored::Legacy(value) => {
            let lists = Vec::<TodoList>::deserialize(value)?;
            debug!(count = lists.len(), "migrating unversioned list collection");
            Ok(lists)
        }
    }
}

/// Durable storage of the whole list collection under [`LISTS_KEY`].
///
/// Both directions fail soft: an unreadable collection loads as empty and a
/// failed write leaves the previous state in place. Failures are logged.
#[derive(Debug)]
pub struct ListStore<S> {
    kv: S,
}

impl<S: KeyValueStore> ListStore<S> {
    pub fn new(kv: S) -> Self {
        ListStore { kv }
    }

    pub fn load(&self) -> Vec<TodoList> {
        let raw = match self.kv.get(LISTS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "could not read list collection");
                return Vec::new();
            }
        };
        decode_lists(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable list collection");
            Vec::new()
        })
    }

    pub fn save(&mut self, lists: &[TodoList]) {
        let raw = match encode_lists(lists) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "could not serialize list collection");
                return;
            }
        };
        if let Err(e) = self.kv.set(LISTS_KEY, &raw) {
            warn!(error = %e, "could not write list collection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::kv::{MemoryStore, StoreError};
    use crate::model::{Item, ItemText, ListName};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    /// A store whose every access fails
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::InvalidKey(key.to_string()))
        }
        fn set(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::InvalidKey(key.to_string()))
        }
        fn delete(&mut self, key: &str) -> Result<(), StoreError> {
            Err(StoreError::InvalidKey(key.to_string()))
        }
    }

    fn sample_list() -> TodoList {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let mut list = TodoList::new("l1".into(), ListName::parse("Trip").unwrap(), created);
        list.items.push(Item::new("a".into(), ItemText::parse("Book flights").unwrap(), created));
        let mut done = Item::new("b".into(), ItemText::parse("Renew passport").unwrap(), created);
        done.completed = true;
        done.updated_at = Utc.timestamp_millis_opt(1_740_826_800_123).unwrap();
        list.items.push(done);
        list
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut store = ListStore::new(MemoryStore::new());
        let lists = vec![sample_list()];
        store.save(&lists);
        assert_eq!(store.load(), lists);
    }

    #[test]
    fn test_saved_form_is_versioned() {
        let mut store = ListStore::new(MemoryStore::new());
        store.save(&[sample_list()]);
        let raw = store.kv.get(LISTS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["lists"][0]["name"], "Trip");
        assert_eq!(value["lists"][0]["todos"][1]["completed"], true);
    }

    #[test]
    fn test_missing_key_loads_empty() {
        let store = ListStore::new(MemoryStore::new());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_malformed_blob_loads_empty() {
        let mut kv = MemoryStore::new();
        kv.set(LISTS_KEY, "not json {{{").unwrap();
        assert!(ListStore::new(kv).load().is_empty());
    }

    #[test]
    fn test_future_version_loads_empty() {
        let mut kv = MemoryStore::new();
        kv.set(LISTS_KEY, r#"{"version": 99, "lists": []}"#).unwrap();
        assert!(ListStore::new(kv).load().is_empty());
        assert!(matches!(
            decode_lists(r#"{"version": 99, "lists": []}"#),
            Err(DecodeError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_future_version_with_new_layout_reports_version() {
        let raw = r#"{"version": 2, "lists": {"byId": {}}}"#;
        assert!(matches!(
            decode_lists(raw),
            Err(DecodeError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_object_without_version_is_rejected() {
        assert!(matches!(
            decode_lists(r#"{"lists": []}"#),
            Err(DecodeError::MissingVersion)
        ));
    }

    #[test]
    fn test_legacy_bare_array_is_migrated() {
        let raw = r#"[
          {
            "id": "m1abc",
            "name": "Groceries",
            "todos": [
              {
                "id": "m1abd",
                "text": "Milk",
                "completed": false,
                "createdAt": "2024-05-01T10:00:00.000Z",
                "updatedAt": "2024-05-01T10:00:00.000Z"
              }
            ],
            "createdAt": "2024-05-01T09:59:59.500Z",
            "updatedAt": "2024-05-01T10:00:00.000Z"
          }
        ]"#;
        let lists = decode_lists(raw).unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].items[0].text, "Milk");
        assert_eq!(
            lists[0].created_at,
            Utc.timestamp_millis_opt(1_714_557_599_500).unwrap()
        );
    }

    #[test]
    fn test_storage_failures_are_swallowed() {
        let mut store = ListStore::new(BrokenStore);
        store.save(&[sample_list()]);
        assert!(store.load().is_empty());
    }
}
