use std::collections::BTreeMap;

use event_emitter_rs::EventEmitter;
use parking_lot::{Mutex, RwLock};

use super::CHANGE_EVENT;

/// A string-keyed observable map with additive-merge semantics.
///
/// `merge` and `insert` never remove keys that are absent from the incoming
/// patch; only `clear` and `replace` drop entries. Subscribers registered via
/// [`on_change`](ObservableMap::on_change) receive the JSON-encoded list of
/// affected keys after each mutation.
pub struct ObservableMap<V> {
    entries: RwLock<BTreeMap<String, V>>,
    emitter: Mutex<EventEmitter>,
}

impl<V: Clone> ObservableMap<V> {
    pub fn new() -> Self {
        ObservableMap {
            entries: RwLock::new(BTreeMap::new()),
            emitter: Mutex::new(EventEmitter::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// A point-in-time copy of all entries.
    pub fn snapshot(&self) -> BTreeMap<String, V> {
        self.entries.read().clone()
    }

    /// Merge entries in: new keys are added, existing keys overwritten,
    /// untouched keys preserved.
    pub fn merge(&self, patch: impl IntoIterator<Item = (String, V)>) {
        let mut touched = Vec::new();
        {
            let mut entries = self.entries.write();
            for (key, value) in patch {
                touched.push(key.clone());
                entries.insert(key, value);
            }
        }
        if !touched.is_empty() {
            self.notify(touched);
        }
    }

    /// Merge a single entry in.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.merge([(key.into(), value)]);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let dropped: Vec<String> = {
            let mut entries = self.entries.write();
            let keys = entries.keys().cloned().collect();
            entries.clear();
            keys
        };
        if !dropped.is_empty() {
            self.notify(dropped);
        }
    }

    /// Overwrite the whole map with the given entries. Used by rollback
    /// paths to restore a pre-call snapshot.
    pub fn replace(&self, entries: BTreeMap<String, V>) {
        let touched: Vec<String> = {
            let mut current = self.entries.write();
            let mut keys: Vec<String> = current.keys().chain(entries.keys()).cloned().collect();
            keys.sort();
            keys.dedup();
            *current = entries;
            keys
        };
        self.notify(touched);
    }

    /// Subscribe to mutations. The listener receives the JSON-encoded list
    /// of affected keys. Returns the listener id.
    pub fn on_change<F>(&self, listener: F) -> String
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.lock().on(CHANGE_EVENT, listener)
    }

    fn notify(&self, keys: Vec<String>) {
        let payload = serde_json::to_string(&keys).unwrap_or_default();
        self.emitter.lock().emit(CHANGE_EVENT, payload);
    }
}

impl<V: Clone> Default for ObservableMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
