use event_emitter_rs::EventEmitter;
use parking_lot::{Mutex, RwLock};

use super::CHANGE_EVENT;

/// An ordered observable sequence with append and in-place splice removal.
///
/// Subscribers receive the new length (as a string) after each mutation.
pub struct ObservableList<T> {
    items: RwLock<Vec<T>>,
    emitter: Mutex<EventEmitter>,
}

impl<T: Clone> ObservableList<T> {
    pub fn new() -> Self {
        ObservableList {
            items: RwLock::new(Vec::new()),
            emitter: Mutex::new(EventEmitter::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// A point-in-time copy of the sequence.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// First item matching the predicate.
    pub fn find<F>(&self, predicate: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.items.read().iter().find(|item| predicate(item)).cloned()
    }

    pub fn push(&self, item: T) {
        let len = {
            let mut items = self.items.write();
            items.push(item);
            items.len()
        };
        self.notify(len);
    }

    /// Append a batch, preserving input order.
    pub fn extend(&self, batch: impl IntoIterator<Item = T>) {
        let (appended, len) = {
            let mut items = self.items.write();
            let before = items.len();
            items.extend(batch);
            (items.len() - before, items.len())
        };
        if appended > 0 {
            self.notify(len);
        }
    }

    /// Splice out the first item matching the predicate, preserving the
    /// order of the remaining items. Returns the removed item.
    pub fn remove_first<F>(&self, predicate: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        let (removed, len) = {
            let mut items = self.items.write();
            let position = items.iter().position(|item| predicate(item));
            (position.map(|index| items.remove(index)), items.len())
        };
        if removed.is_some() {
            self.notify(len);
        }
        removed
    }

    /// Subscribe to mutations. The listener receives the new length as a
    /// string. Returns the listener id.
    pub fn on_change<F>(&self, listener: F) -> String
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.lock().on(CHANGE_EVENT, listener)
    }

    fn notify(&self, len: usize) {
        self.emitter.lock().emit(CHANGE_EVENT, len.to_string());
    }
}

impl<T: Clone> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn push_and_extend_preserve_order() {
        let list = ObservableList::new();
        list.push(1);
        list.extend([2, 3]);
        assert_eq!(list.snapshot(), vec![1, 2, 3]);
        assert_eq!(list.get(1), Some(2));
        assert_eq!(list.get(9), None);
    }

    #[test]
    fn remove_first_splices_in_place() {
        let list = ObservableList::new();
        list.extend([1, 2, 3, 2]);
        assert_eq!(list.remove_first(|item| *item == 2), Some(2));
        assert_eq!(list.snapshot(), vec![1, 3, 2]);
        assert_eq!(list.remove_first(|item| *item == 9), None);
    }

    #[test]
    fn change_listener_fires_per_mutation() {
        let list = ObservableList::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        list.on_change(move |_len| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        list.push(1);
        list.extend([2, 3]);
        list.remove_first(|item| *item == 1);

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
