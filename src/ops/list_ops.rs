use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::io::kv::KeyValueStore;
use crate::io::store::ListStore;
use crate::model::item::{Item, ItemPatch};
use crate::model::list::{ListPatch, TodoList};
use crate::model::text::{ItemText, ListName};

/// Error type for resolving user-supplied list and item references
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("list not found: {0}")]
    ListNotFound(String),
    #[error("ambiguous: {count} lists named \"{name}\". Use the list id instead.")]
    AmbiguousList { name: String, count: usize },
    #[error("item not found: {0}")]
    ItemNotFound(String),
}

/// Generate a fresh opaque id (ULID: millisecond timestamp + randomness)
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

/// CRUD over lists and their items.
///
/// Every mutation is a read-modify-write of the whole collection through the
/// [`ListStore`]. Unknown ids are reported as `None`/`false`, never as errors.
#[derive(Debug)]
pub struct ListRepository<S> {
    store: ListStore<S>,
}

impl<S: KeyValueStore> ListRepository<S> {
    pub fn new(kv: S) -> Self {
        ListRepository {
            store: ListStore::new(kv),
        }
    }

    // -----------------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------------

    /// Snapshot of the whole collection
    pub fn lists(&self) -> Vec<TodoList> {
        self.store.load()
    }

    pub fn get_list(&self, list_id: &str) -> Option<TodoList> {
        self.store.load().into_iter().find(|l| l.id == list_id)
    }

    pub fn create_list(&mut self, name: ListName) -> TodoList {
        let mut lists = self.store.load();
        let taken: HashSet<&str> = lists.iter().map(|l| l.id.as_str()).collect();
        let id = unique_id(&taken);
        let list = TodoList::new(id, name, Utc::now());
        lists.push(list.clone());
        self.store.save(&lists);
        debug!(list = %list.id, "created list");
        list
    }

    pub fn update_list(&mut self, list_id: &str, patch: ListPatch) -> Option<TodoList> {
        self.mutate_list(list_id, |list, now| {
            list.apply(patch, now);
            Some(list.clone())
        })
    }

    pub fn delete_list(&mut self, list_id: &str) -> bool {
        let mut lists = self.store.load();
        let before = lists.len();
        lists.retain(|l| l.id != list_id);
        if lists.len() == before {
            return false;
        }
        self.store.save(&lists);
        debug!(list = %list_id, "deleted list");
        true
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    pub fn add_item(&mut self, list_id: &str, text: ItemText) -> Option<Item> {
        self.mutate_list(list_id, |list, now| {
            let taken: HashSet<&str> = list.items.iter().map(|i| i.id.as_str()).collect();
            let item = Item::new(unique_id(&taken), text, now);
            list.items.push(item.clone());
            list.touch(now);
            Some(item)
        })
    }

    /// Bulk-append items (the generation pathway). Items without an id, or
    /// whose id is already used in the list, get a fresh one. Items with
    /// blank text are skipped.
    pub fn add_items(&mut self, list_id: &str, items: Vec<Item>) -> bool {
        self.mutate_list(list_id, |list, now| {
            let mut taken: HashSet<String> = list.items.iter().map(|i| i.id.clone()).collect();
            let mut added = 0usize;
            for mut item in items {
                let text = item.text.trim();
                if text.is_empty() {
                    continue;
                }
                item.text = text.to_string();
                if item.id.is_empty() || taken.contains(&item.id) {
                    let taken_ref: HashSet<&str> = taken.iter().map(|s| s.as_str()).collect();
                    item.id = unique_id(&taken_ref);
                }
                taken.insert(item.id.clone());
                list.items.push(item);
                added += 1;
            }
            if added > 0 {
                list.touch(now);
            }
            debug!(list = %list.id, added, "appended items");
            Some(())
        })
        .is_some()
    }

    pub fn update_item(&mut self, list_id: &str, item_id: &str, patch: ItemPatch) -> Option<Item> {
        self.mutate_list(list_id, |list, now| {
            let item = list.item_mut(item_id)?;
            item.apply(patch, now);
            let updated = item.clone();
            list.touch(now);
            Some(updated)
        })
    }

    pub fn delete_item(&mut self, list_id: &str, item_id: &str) -> bool {
        self.mutate_list(list_id, |list, now| {
            let before = list.items.len();
            list.items.retain(|i| i.id != item_id);
            if list.items.len() == before {
                return None;
            }
            list.touch(now);
            Some(())
        })
        .is_some()
    }

    /// Flip `completed`. Reads the current value, then updates through
    /// [`update_item`](Self::update_item).
    pub fn toggle_item(&mut self, list_id: &str, item_id: &str) -> Option<Item> {
        let current = self.get_list(list_id)?.item(item_id)?.completed;
        self.update_item(list_id, item_id, ItemPatch::completed(!current))
    }

    /// Load, apply `f` to the list with `list_id`, and save only when `f`
    /// returns `Some`.
    fn mutate_list<T>(
        &mut self,
        list_id: &str,
        f: impl FnOnce(&mut TodoList, DateTime<Utc>) -> Option<T>,
    ) -> Option<T> {
        let mut lists = self.store.load();
        let list = lists.iter_mut().find(|l| l.id == list_id)?;
        let result = f(list, Utc::now())?;
        self.store.save(&lists);
        Some(result)
    }
}

/// A fresh id not present in `taken`
fn unique_id(taken: &HashSet<&str>) -> String {
    loop {
        let id = new_id();
        if !taken.contains(id.as_str()) {
            return id;
        }
    }
}

// ---------------------------------------------------------------------------
// Reference resolution
// ---------------------------------------------------------------------------

/// Find a list by exact id, or else by unique case-insensitive name.
pub fn find_list<'a>(lists: &'a [TodoList], reference: &str) -> Result<&'a TodoList, LookupError> {
    if let Some(list) = lists.iter().find(|l| l.id == reference) {
        return Ok(list);
    }
    let wanted = reference.trim().to_lowercase();
    let matches: Vec<&TodoList> = lists
        .iter()
        .filter(|l| l.name.to_lowercase() == wanted)
        .collect();
    match matches.len() {
        0 => Err(LookupError::ListNotFound(reference.to_string())),
        1 => Ok(matches[0]),
        count => Err(LookupError::AmbiguousList {
            name: reference.to_string(),
            count,
        }),
    }
}

/// Find an item by exact id, or else by 1-based position.
pub fn find_item<'a>(list: &'a TodoList, reference: &str) -> Result<&'a Item, LookupError> {
    if let Some(item) = list.item(reference) {
        return Ok(item);
    }
    reference
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| list.items.get(idx))
        .ok_or_else(|| LookupError::ItemNotFound(reference.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::kv::MemoryStore;
    use crate::io::store::{LISTS_KEY, encode_lists};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn repo() -> ListRepository<MemoryStore> {
        ListRepository::new(MemoryStore::new())
    }

    fn name(s: &str) -> ListName {
        ListName::parse(s).unwrap()
    }

    fn text(s: &str) -> ItemText {
        ItemText::parse(s).unwrap()
    }

    /// A repository holding one list last touched in 2020
    fn repo_with_stale_list() -> (ListRepository<MemoryStore>, TodoList) {
        let past = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut list = TodoList::new("stale".into(), name("Old"), past);
        list.items.push(Item::new("i1".into(), text("Stale"), past));
        let mut kv = MemoryStore::new();
        kv.set(LISTS_KEY, &encode_lists(&[list.clone()]).unwrap()).unwrap();
        (ListRepository::new(kv), list)
    }

    // --- Lists ---

    #[test]
    fn test_create_list_persists() {
        let mut repo = repo();
        let list = repo.create_list(name("Work"));
        assert!(list.items.is_empty());
        assert_eq!(list.created_at, list.updated_at);
        assert_eq!(repo.lists(), vec![list.clone()]);
        assert_eq!(repo.get_list(&list.id), Some(list));
    }

    #[test]
    fn test_create_list_ids_are_unique() {
        let mut repo = repo();
        let ids: HashSet<String> = (0..20).map(|_| repo.create_list(name("L")).id).collect();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn test_lists_keep_creation_order() {
        let mut repo = repo();
        repo.create_list(name("First"));
        repo.create_list(name("Second"));
        let names: Vec<String> = repo.lists().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_update_list_renames_and_bumps() {
        let mut repo = repo();
        let list = repo.create_list(name("Wrok"));
        let updated = repo
            .update_list(&list.id, ListPatch::rename(name("Work")))
            .unwrap();
        assert_eq!(updated.name, "Work");
        assert_eq!(updated.created_at, list.created_at);
        assert!(updated.updated_at >= list.updated_at);
        assert_eq!(repo.get_list(&list.id).unwrap().name, "Work");
    }

    #[test]
    fn test_update_missing_list_is_none() {
        let mut repo = repo();
        assert!(repo.update_list("nope", ListPatch::default()).is_none());
    }

    #[test]
    fn test_delete_list_twice() {
        let mut repo = repo();
        let list = repo.create_list(name("Temp"));
        assert!(repo.delete_list(&list.id));
        assert!(!repo.delete_list(&list.id));
        assert!(repo.lists().is_empty());
    }

    #[test]
    fn test_delete_missing_list_leaves_collection_unchanged() {
        let mut repo = repo();
        let list = repo.create_list(name("Keep"));
        assert!(!repo.delete_list("other"));
        assert_eq!(repo.lists(), vec![list]);
    }

    // --- Items ---

    #[test]
    fn test_add_item_is_open_with_equal_timestamps() {
        let mut repo = repo();
        let list = repo.create_list(name("Work"));
        let item = repo.add_item(&list.id, text("Write report")).unwrap();
        assert!(!item.completed);
        assert_eq!(item.created_at, item.updated_at);

        let stored = repo.get_list(&list.id).unwrap();
        assert_eq!(stored.items, vec![item.clone()]);
        assert!(stored.updated_at >= item.updated_at);
    }

    #[test]
    fn test_add_item_to_missing_list_is_none() {
        let mut repo = repo();
        assert!(repo.add_item("nope", text("x")).is_none());
        assert!(repo.lists().is_empty());
    }

    #[test]
    fn test_add_items_assigns_missing_and_duplicate_ids() {
        let mut repo = repo();
        let list = repo.create_list(name("Trip"));
        let existing = repo.add_item(&list.id, text("Pack")).unwrap();
        let now = Utc::now();
        let incoming = vec![
            Item::new(String::new(), text("Book flights"), now),
            Item::new(existing.id.clone(), text("Collides"), now),
            Item::new("keep-me".into(), text("Has id"), now),
            Item::new(String::new(), text("Book hotel"), now),
        ];
        assert!(repo.add_items(&list.id, incoming));

        let stored = repo.get_list(&list.id).unwrap();
        let texts: Vec<&str> = stored.items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["Pack", "Book flights", "Collides", "Has id", "Book hotel"]);
        let ids: HashSet<&str> = stored.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| !id.is_empty()));
        assert_eq!(stored.items[3].id, "keep-me");
    }

    #[test]
    fn test_add_items_skips_blank_text() {
        let mut repo = repo();
        let list = repo.create_list(name("L"));
        let mut blank = Item::new(String::new(), text("x"), Utc::now());
        blank.text = "   ".into();
        assert!(repo.add_items(&list.id, vec![blank]));
        assert!(repo.get_list(&list.id).unwrap().items.is_empty());
    }

    #[test]
    fn test_add_items_to_missing_list_is_false() {
        let mut repo = repo();
        assert!(!repo.add_items("nope", Vec::new()));
    }

    #[test]
    fn test_update_item_text_and_completion() {
        let mut repo = repo();
        let list = repo.create_list(name("Work"));
        let item = repo.add_item(&list.id, text("Draft")).unwrap();
        let updated = repo
            .update_item(
                &list.id,
                &item.id,
                ItemPatch {
                    text: Some(text("Final")),
                    completed: Some(true),
                },
            )
            .unwrap();
        assert_eq!(updated.text, "Final");
        assert!(updated.completed);
        assert_eq!(updated.created_at, item.created_at);
        assert!(updated.updated_at >= item.updated_at);

        let stored = repo.get_list(&list.id).unwrap();
        assert_eq!(stored.updated_at, updated.updated_at);
    }

    #[test]
    fn test_update_missing_item_or_list_is_none() {
        let mut repo = repo();
        let list = repo.create_list(name("Work"));
        assert!(repo.update_item(&list.id, "nope", ItemPatch::default()).is_none());
        assert!(repo.update_item("nope", "nope", ItemPatch::default()).is_none());
        // a failed update must not bump the list
        assert_eq!(repo.get_list(&list.id).unwrap().updated_at, list.updated_at);
    }

    #[test]
    fn test_delete_item_then_again() {
        let mut repo = repo();
        let list = repo.create_list(name("Work"));
        let item = repo.add_item(&list.id, text("Gone soon")).unwrap();
        assert!(repo.delete_item(&list.id, &item.id));
        assert!(!repo.delete_item(&list.id, &item.id));
        assert!(!repo.delete_item("nope", &item.id));
        assert!(repo.get_list(&list.id).unwrap().items.is_empty());
    }

    #[test]
    fn test_delete_item_bumps_list_updated_at() {
        let (mut repo, list) = repo_with_stale_list();
        assert!(repo.delete_item(&list.id, "i1"));
        assert!(repo.get_list(&list.id).unwrap().updated_at > list.updated_at);
    }

    #[test]
    fn test_add_items_bumps_list_updated_at() {
        let (mut repo, list) = repo_with_stale_list();
        let incoming = vec![Item::new(String::new(), text("Fresh"), Utc::now())];
        assert!(repo.add_items(&list.id, incoming));
        assert!(repo.get_list(&list.id).unwrap().updated_at > list.updated_at);
    }

    #[test]
    fn test_add_items_with_nothing_usable_leaves_list_untouched() {
        let (mut repo, list) = repo_with_stale_list();
        let mut blank = Item::new(String::new(), text("x"), Utc::now());
        blank.text = " ".into();
        assert!(repo.add_items(&list.id, vec![blank]));
        assert_eq!(repo.get_list(&list.id).unwrap().updated_at, list.updated_at);
    }

    #[test]
    fn test_toggle_is_self_inverse() {
        let mut repo = repo();
        let list = repo.create_list(name("Work"));
        let item = repo.add_item(&list.id, text("Flip me")).unwrap();

        let once = repo.toggle_item(&list.id, &item.id).unwrap();
        assert!(once.completed);
        assert!(once.updated_at >= item.updated_at);

        let twice = repo.toggle_item(&list.id, &item.id).unwrap();
        assert_eq!(twice.completed, item.completed);
        assert!(twice.updated_at >= once.updated_at);
    }

    #[test]
    fn test_toggle_missing_is_none() {
        let mut repo = repo();
        let list = repo.create_list(name("Work"));
        assert!(repo.toggle_item(&list.id, "nope").is_none());
        assert!(repo.toggle_item("nope", "nope").is_none());
    }

    #[test]
    fn test_work_scenario() {
        let mut repo = repo();
        let work = repo.create_list(name("Work"));
        let a = repo.add_item(&work.id, text("A")).unwrap();
        let b = repo.add_item(&work.id, text("B")).unwrap();
        repo.toggle_item(&work.id, &a.id).unwrap();

        let stored = repo.get_list(&work.id).unwrap();
        assert_eq!(stored.name, "Work");
        assert_eq!(stored.items.len(), 2);
        assert!(stored.item(&a.id).unwrap().completed);
        assert!(!stored.item(&b.id).unwrap().completed);
        for item in &stored.items {
            assert!(stored.updated_at >= item.updated_at);
        }
    }

    #[test]
    fn test_item_ids_only_unique_per_list() {
        let mut repo = repo();
        let one = repo.create_list(name("One"));
        let two = repo.create_list(name("Two"));
        let now = Utc::now();
        repo.add_items(&one.id, vec![Item::new("same".into(), text("x"), now)]);
        repo.add_items(&two.id, vec![Item::new("same".into(), text("y"), now)]);
        assert_eq!(repo.get_list(&one.id).unwrap().items[0].id, "same");
        assert_eq!(repo.get_list(&two.id).unwrap().items[0].id, "same");
    }

    #[test]
    fn test_state_survives_a_new_repository() {
        let mut kv = MemoryStore::new();
        let list_id = {
            let mut repo = ListRepository::new(&mut kv);
            let list = repo.create_list(name("Persisted"));
            repo.add_item(&list.id, text("still here")).unwrap();
            list.id
        };
        let repo = ListRepository::new(kv);
        assert_eq!(repo.get_list(&list_id).unwrap().items[0].text, "still here");
    }

    // --- Reference resolution ---

    #[test]
    fn test_find_list_by_id_or_name() {
        let mut repo = repo();
        let work = repo.create_list(name("Work"));
        repo.create_list(name("Home"));
        let lists = repo.lists();
        assert_eq!(find_list(&lists, &work.id).unwrap().name, "Work");
        assert_eq!(find_list(&lists, "home").unwrap().name, "Home");
        assert!(matches!(
            find_list(&lists, "garden"),
            Err(LookupError::ListNotFound(_))
        ));
    }

    #[test]
    fn test_find_list_ambiguous_name() {
        let mut repo = repo();
        repo.create_list(name("Dup"));
        repo.create_list(name("dup"));
        let lists = repo.lists();
        assert!(matches!(
            find_list(&lists, "DUP"),
            Err(LookupError::AmbiguousList { count: 2, .. })
        ));
    }

    #[test]
    fn test_find_item_by_id_or_position() {
        let mut repo = repo();
        let list = repo.create_list(name("Work"));
        let a = repo.add_item(&list.id, text("A")).unwrap();
        repo.add_item(&list.id, text("B")).unwrap();
        let list = repo.get_list(&list.id).unwrap();
        assert_eq!(find_item(&list, &a.id).unwrap().text, "A");
        assert_eq!(find_item(&list, "2").unwrap().text, "B");
        assert!(find_item(&list, "0").is_err());
        assert!(find_item(&list, "3").is_err());
        assert!(find_item(&list, "zzz").is_err());
    }
}
