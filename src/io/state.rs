use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::io::kv::{KeyValueStore, StoreError};
use crate::io::store::{DecodeError, Stored, read_format};
use crate::model::view_mode::{Expanded, ViewMode};

/// Storage key for the view-mode state
pub const VIEW_MODES_KEY: &str = "todoListViewModes";

/// Current on-disk format version of the view-mode state
pub const VIEW_STATE_VERSION: u32 = 1;

/// Persisted view-mode state: `[listId, mode]` pairs, at most one of them
#[derive(Serialize)]
struct ViewStateEnvelope<'a> {
    version: u32,
    entries: Vec<(&'a str, ViewMode)>,
}

#[derive(Deserialize)]
struct ViewStateBody {
    #[serde(default)]
    entries: Vec<(String, ViewMode)>,
}

/// Serialize the expanded list (if any) to its wire form
pub fn encode_view_state(expanded: Option<&Expanded>) -> Result<String, serde_json::Error> {
    let entries = expanded
        .map(|e| vec![(e.list_id.as_str(), ViewMode::from(e.mode))])
        .unwrap_or_default();
    serde_json::to_string(&ViewStateEnvelope {
        version: VIEW_STATE_VERSION,
        entries,
    })
}

/// Parse the wire form. Only the last non-compact entry survives, which
/// also collapses a legacy map with several expanded lists to one.
pub fn decode_view_state(raw: &str) -> Result<Option<Expanded>, DecodeError> {
    let entries = match read_format(raw, VIEW_STATE_VERSION)? {
        Stored::Current(value) => ViewStateBody::deserialize(value)?.entries,
        // Unversioned per-list mode map; several lists may claim an overlay
        Stored::Legacy(value) => {
            let entries = Vec::<(String, ViewMode)>::deserialize(value)?;
            debug!(count = entries.len(), "migrating unversioned view-mode map");
            entries
        }
    };
    Ok(entries
        .into_iter()
        .rev()
        .find_map(|(list_id, mode)| mode.overlay().map(|mode| Expanded { list_id, mode })))
}

/// Read the view-mode state. Absent or unreadable state means nothing is expanded.
pub fn read_view_state<S: KeyValueStore>(kv: &S) -> Option<Expanded> {
    let raw = match kv.get(VIEW_MODES_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "could not read view-mode state");
            return None;
        }
    };
    decode_view_state(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable view-mode state");
        None
    })
}

/// Write the view-mode state
pub fn write_view_state<S: KeyValueStore>(
    kv: &mut S,
    expanded: Option<&Expanded>,
) -> Result<(), StoreError> {
    let raw = encode_view_state(expanded).map_err(|e| StoreError::WriteError {
        path: VIEW_MODES_KEY.into(),
        source: e.into(),
    })?;
    kv.set(VIEW_MODES_KEY, &raw)
}
