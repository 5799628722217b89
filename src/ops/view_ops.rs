use tracing::{debug, warn};

use crate::io::kv::KeyValueStore;
use crate::io::state::{read_view_state, write_view_state};
use crate::model::view_mode::{Expanded, ViewMode};

/// Which list, if any, is expanded into an overlay.
///
/// There is exactly one piece of state: the expanded list and its mode. Every
/// other list is compact. Each transition is persisted immediately.
#[derive(Debug)]
pub struct ViewModes<S> {
    kv: S,
    expanded: Option<Expanded>,
}

impl<S: KeyValueStore> ViewModes<S> {
    /// Restore the persisted state. Unreadable state starts with everything compact.
    pub fn load(kv: S) -> Self {
        let expanded = read_view_state(&kv);
        ViewModes { kv, expanded }
    }

    pub fn mode(&self, list_id: &str) -> ViewMode {
        match &self.expanded {
            Some(e) if e.list_id == list_id => e.mode.into(),
            _ => ViewMode::Compact,
        }
    }

    /// The list currently rendered as an overlay
    pub fn active_overlay(&self) -> Option<&str> {
        self.expanded.as_ref().map(|e| e.list_id.as_str())
    }

    /// Non-compact entries as `(list_id, mode)` pairs (zero or one)
    pub fn states(&self) -> Vec<(String, ViewMode)> {
        self.expanded
            .iter()
            .map(|e| (e.list_id.clone(), e.mode.into()))
            .collect()
    }

    /// Set a list's mode. Expanding a list collapses whichever list was
    /// expanded before; compacting a list that is not expanded is a no-op.
    pub fn set_mode(&mut self, list_id: &str, mode: ViewMode) {
        let next = match mode.overlay() {
            Some(mode) => Some(Expanded {
                list_id: list_id.to_string(),
                mode,
            }),
            None if self.active_overlay() == Some(list_id) => None,
            None => return,
        };
        debug!(list = %list_id, from = %self.mode(list_id), to = %mode, "view mode transition");
        self.expanded = next;
        self.persist();
    }

    /// Cycle compact → medium → large → compact. Returns the new mode.
    pub fn toggle(&mut self, list_id: &str) -> ViewMode {
        let next = self.mode(list_id).next();
        self.set_mode(list_id, next);
        next
    }

    /// Medium → large. Any other starting mode is left alone.
    pub fn transition_to_large(&mut self, list_id: &str) -> bool {
        if self.mode(list_id) != ViewMode::Medium {
            return false;
        }
        self.set_mode(list_id, ViewMode::Large);
        true
    }

    /// Compact the expanded list, returning its id
    pub fn close_overlay(&mut self) -> Option<String> {
        let list_id = self.active_overlay()?.to_string();
        self.set_mode(&list_id, ViewMode::Compact);
        Some(list_id)
    }

    /// Drop any state for a list that no longer exists
    pub fn forget(&mut self, list_id: &str) {
        if self.active_overlay() == Some(list_id) {
            self.set_mode(list_id, ViewMode::Compact);
        }
    }

    pub fn reset(&mut self) {
        debug!("view modes reset");
        self.expanded = None;
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(e) = write_view_state(&mut self.kv, self.expanded.as_ref()) {
            warn!(error = %e, "could not write view-mode state");
        }
    }
}
