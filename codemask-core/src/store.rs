use crate::errors::StoreError;
use crate::serialization::{rules_from_json, rules_to_json};
use crate::storage::{NoOpStorage, RuleStorage};
use crate::types::*;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Handle returned by `subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn() + Send + Sync>;

/// Single source of truth for the ordered rule list.
///
/// Every successful mutation is written to the storage backend and then
/// announced to each subscriber exactly once. Readers only ever get
/// copies of the list. Not-found ids make update/delete/toggle a no-op:
/// nothing is written and nobody is notified.
///
/// The store expects one mutation in flight at a time; wrap it in a
/// `Mutex` when several threads need to mutate it.
pub struct RuleStore {
    rules: Vec<Rule>,
    storage: Box<dyn RuleStorage + Send + Sync>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl RuleStore {
    /// Load the persisted list from `storage`, starting empty if nothing was saved
    pub fn open(storage: impl RuleStorage + Send + Sync + 'static) -> Result<Self, StoreError> {
        let rules = storage.load()?.unwrap_or_default();
        tracing::debug!(
            backend = storage.name(),
            count = rules.len(),
            "loaded rule list"
        );

        let mut store = Self {
            rules,
            storage: Box::new(storage),
            listeners: Vec::new(),
            next_subscription: 0,
        };
        store.repair_duplicate_ids();
        Ok(store)
    }

    /// Empty store without persistence
    pub fn in_memory() -> Self {
        Self {
            rules: Vec::new(),
            storage: Box::new(NoOpStorage::new()),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    // ===== READS =====

    /// Snapshot of all rules in application order
    pub fn get_rules(&self) -> Vec<Rule> {
        self.rules.clone()
    }

    /// Snapshot of the enabled rules only, in application order
    pub fn enabled_rules(&self) -> Vec<Rule> {
        self.rules.iter().filter(|r| r.is_enabled).cloned().collect()
    }

    pub fn find_rule(&self, id: &str) -> Option<Rule> {
        self.rules.iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    // ===== MUTATIONS =====

    /// Append `rule` to the end of the list. A rule whose id is already
    /// taken is stored under a fresh id; the id actually used is returned.
    pub fn add_rule(&mut self, mut rule: Rule) -> Result<RuleId, StoreError> {
        if self.contains_id(&rule.id) {
            tracing::debug!(id = %rule.id, "rule id already in use, assigning a fresh one");
            rule = rule.with_fresh_id();
        }
        let id = rule.id.clone();
        self.rules.push(rule);
        self.commit()?;
        Ok(id)
    }

    /// Replace the rule with the same id in place. Returns `false` if no such rule exists.
    pub fn update_rule(&mut self, rule: Rule) -> Result<bool, StoreError> {
        let Some(slot) = self.rules.iter_mut().find(|r| r.id == rule.id) else {
            return Ok(false);
        };
        *slot = rule;
        self.commit()?;
        Ok(true)
    }

    pub fn delete_rule(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(index) = self.rules.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        self.rules.remove(index);
        self.commit()?;
        Ok(true)
    }

    /// Flip `is_enabled` on the rule with this id
    pub fn toggle_rule(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(rule) = self.rules.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        rule.is_enabled = !rule.is_enabled;
        self.commit()?;
        Ok(true)
    }

    /// Swap in a whole new list (e.g. after the host reorders rules).
    /// Duplicate ids in the new list are given fresh ones.
    pub fn replace_rules(&mut self, rules: Vec<Rule>) -> Result<(), StoreError> {
        self.rules = rules;
        self.repair_duplicate_ids();
        self.commit()
    }

    // ===== EXPORT / IMPORT =====

    /// Serialize the full list, disabled rules and ids included
    pub fn export_rules(&self) -> Result<String, StoreError> {
        rules_to_json(&self.rules)
    }

    /// Write `export_rules` output to `path`. A failed write leaves the store untouched.
    pub fn export_to_path(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.export_rules()?;
        fs::write(path, json).map_err(|e| StoreError::io(path, e))?;
        tracing::debug!(path = %path.display(), count = self.rules.len(), "exported rules");
        Ok(())
    }

    /// Parse `source` and combine it with the stored list according to `mode`.
    /// Every imported record receives a fresh id. A malformed payload fails
    /// the whole call and leaves the list unchanged. Returns the number of
    /// rules added.
    pub fn import_rules(&mut self, source: &str, mode: ImportMode) -> Result<usize, StoreError> {
        let imported = rules_from_json(source)?;

        let added = match mode {
            ImportMode::Merge => {
                let mut known: HashSet<String> =
                    self.rules.iter().map(|r| r.original_text.clone()).collect();
                let mut added = 0;
                for rule in imported {
                    if known.insert(rule.original_text.clone()) {
                        self.rules.push(rule.with_fresh_id());
                        added += 1;
                    }
                }
                added
            }
            ImportMode::Replace => {
                self.rules = imported.into_iter().map(Rule::with_fresh_id).collect();
                self.rules.len()
            }
        };

        tracing::debug!(?mode, added, total = self.rules.len(), "imported rules");
        self.commit()?;
        Ok(added)
    }

    pub fn import_from_path(&mut self, path: &Path, mode: ImportMode) -> Result<usize, StoreError> {
        let source = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        self.import_rules(&source, mode)
    }

    // ===== CHANGE NOTIFICATION =====

    /// Register `listener` to be called after every successful mutation
    pub fn subscribe(&mut self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    // ===== INTERNALS =====

    fn contains_id(&self, id: &str) -> bool {
        self.rules.iter().any(|r| r.id == id)
    }

    fn repair_duplicate_ids(&mut self) {
        let mut seen = HashSet::new();
        for rule in &mut self.rules {
            if !seen.insert(rule.id.clone()) {
                rule.id = new_rule_id();
                seen.insert(rule.id.clone());
            }
        }
    }

    /// Persist, then notify. Listeners hear about the in-memory change even
    /// when the write fails; the write error is still returned.
    fn commit(&self) -> Result<(), StoreError> {
        let saved = self.storage.save(&self.rules);
        if let Err(e) = &saved {
            tracing::warn!(backend = self.storage.name(), "failed to persist rules: {e}");
        }
        for (_, listener) in &self.listeners {
            listener();
        }
        saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_listener(store: &mut RuleStore) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn test_snapshots_are_copies() {
        let mut store = RuleStore::in_memory();
        store.add_rule(Rule::new("a", "b")).unwrap();

        let mut snapshot = store.get_rules();
        snapshot[0].replacement_text = "changed".to_string();
        snapshot.clear();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_rules()[0].replacement_text, "b");
    }

    #[test]
    fn test_add_appends_in_order() {
        let mut store = RuleStore::in_memory();
        store.add_rule(Rule::new("first", "1")).unwrap();
        store.add_rule(Rule::new("second", "2")).unwrap();
        let texts: Vec<_> = store.get_rules().into_iter().map(|r| r.original_text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_add_with_taken_id_gets_fresh_id() {
        let mut store = RuleStore::in_memory();
        let rule = Rule::new("a", "b");
        let first = store.add_rule(rule.clone()).unwrap();
        let second = store.add_rule(rule).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update_preserves_position() {
        let mut store = RuleStore::in_memory();
        store.add_rule(Rule::new("a", "1")).unwrap();
        let id = store.add_rule(Rule::new("b", "2")).unwrap();
        store.add_rule(Rule::new("c", "3")).unwrap();

        let mut rule = store.find_rule(&id).unwrap();
        rule.replacement_text = "two".to_string();
        assert!(store.update_rule(rule).unwrap());

        let rules = store.get_rules();
        assert_eq!(rules[1].id, id);
        assert_eq!(rules[1].replacement_text, "two");
    }

    #[test]
    fn test_unknown_id_mutations_are_silent_noops() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = RuleStore::open(Arc::clone(&storage)).unwrap();
        let notified = counting_listener(&mut store);

        assert!(!store.update_rule(Rule::new("x", "y")).unwrap());
        assert!(!store.delete_rule("missing").unwrap());
        assert!(!store.toggle_rule("missing").unwrap());

        assert_eq!(notified.load(Ordering::SeqCst), 0);
        assert!(storage.saved().is_none());
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut store = RuleStore::in_memory();
        let id = store.add_rule(Rule::new("a", "b")).unwrap();
        store.toggle_rule(&id).unwrap();
        assert!(!store.find_rule(&id).unwrap().is_enabled);
        assert!(store.enabled_rules().is_empty());
        store.toggle_rule(&id).unwrap();
        assert!(store.find_rule(&id).unwrap().is_enabled);
    }

    #[test]
    fn test_each_mutation_notifies_each_listener_once() {
        let mut store = RuleStore::in_memory();
        let first = counting_listener(&mut store);
        let second = counting_listener(&mut store);

        let id = store.add_rule(Rule::new("a", "b")).unwrap();
        store.toggle_rule(&id).unwrap();
        store.delete_rule(&id).unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 3);
        assert_eq!(second.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut store = RuleStore::in_memory();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let sub = store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.add_rule(Rule::new("a", "b")).unwrap();
        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.add_rule(Rule::new("c", "d")).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = RuleStore::open(Arc::clone(&storage)).unwrap();

        let id = store.add_rule(Rule::new("a", "b")).unwrap();
        assert_eq!(storage.saved().unwrap().len(), 1);

        store.toggle_rule(&id).unwrap();
        assert!(!storage.saved().unwrap()[0].is_enabled);

        store.delete_rule(&id).unwrap();
        assert!(storage.saved().unwrap().is_empty());
    }

    #[test]
    fn test_open_repairs_duplicate_ids() {
        let rule = Rule::new("a", "b");
        let storage = MemoryStorage::with_rules(vec![rule.clone(), rule]);
        let store = RuleStore::open(storage).unwrap();
        let rules = store.get_rules();
        assert_ne!(rules[0].id, rules[1].id);
    }

    #[test]
    fn test_merge_import_skips_known_original_text() {
        let mut store = RuleStore::in_memory();
        let existing = Rule::new("Acme", "ORG");
        store.add_rule(existing.clone()).unwrap();

        let payload = rules_to_json(&[
            Rule::new("Acme", "DIFFERENT").with_regex(true),
            Rule::new("Globex", "ORG2"),
            Rule::new("Globex", "ORG3"),
        ])
        .unwrap();

        let added = store.import_rules(&payload, ImportMode::Merge).unwrap();
        assert_eq!(added, 1);

        let rules = store.get_rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0], existing);
        assert_eq!(rules[1].original_text, "Globex");
        assert_eq!(rules[1].replacement_text, "ORG2");
    }

    #[test]
    fn test_import_assigns_fresh_ids() {
        let mut store = RuleStore::in_memory();
        let kept = store.add_rule(Rule::new("keep", "k")).unwrap();
        let exported = store.export_rules().unwrap();

        store.import_rules(&exported, ImportMode::Replace).unwrap();
        let rules = store.get_rules();
        assert_eq!(rules.len(), 1);
        assert_ne!(rules[0].id, kept);
        assert_eq!(rules[0].original_text, "keep");
    }

    #[test]
    fn test_replace_import_adopts_list_wholesale() {
        let mut store = RuleStore::in_memory();
        store.add_rule(Rule::new("old", "o")).unwrap();
        let imported = vec![Rule::new("a", "1"), Rule::new("a", "2"), Rule::new("b", "3")];
        let payload = rules_to_json(&imported).unwrap();

        let added = store.import_rules(&payload, ImportMode::Replace).unwrap();
        assert_eq!(added, 3);
        assert_eq!(store.len(), 3);

        let ids: HashSet<_> = store.get_rules().into_iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 3);
        for rule in &imported {
            assert!(!ids.contains(&rule.id));
        }
    }

    #[test]
    fn test_malformed_import_leaves_list_untouched() {
        let mut store = RuleStore::in_memory();
        store.add_rule(Rule::new("a", "b")).unwrap();
        let notified = counting_listener(&mut store);
        let before = store.get_rules();

        for mode in [ImportMode::Merge, ImportMode::Replace] {
            let err = store.import_rules("[{\"id\": 3}]", mode).unwrap_err();
            assert!(matches!(err, StoreError::MalformedImport(_)));
        }

        assert_eq!(store.get_rules(), before);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_export_write_failure_is_reported() {
        let mut store = RuleStore::in_memory();
        store.add_rule(Rule::new("a", "b")).unwrap();
        let dir = tempfile::tempdir().unwrap();

        // A directory path cannot be written as a file
        let err = store.export_to_path(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(store.len(), 1);
    }
}
