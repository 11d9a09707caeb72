//! Listener registry: two ordered maps of registrations keyed by event name.
//!
//! Pure data. The registry has no synchronisation of its own, it lives inside
//! the owning thread's [`Emitter`](crate::Emitter) and is only ever touched
//! from there.

use crate::types::{EntryId, EventName, Listener, ListenerEntry, ListenerKind};
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::trace;

/// Ordered registrations for a single event. Most events have a handful of
/// listeners, so the common case stays off the heap.
pub type ListenerSeq<P> = SmallVec<[ListenerEntry<P>; 4]>;

/// Copy of an event's registrations taken at one instant.
///
/// Dispatch iterates the snapshot, never the live registry, so listeners may
/// subscribe or unsubscribe while they run.
pub struct Snapshot<P> {
    pub persistent: ListenerSeq<P>,
    pub one_shot: ListenerSeq<P>,
}

impl<P> Snapshot<P> {
    pub fn is_empty(&self) -> bool {
        self.persistent.is_empty() && self.one_shot.is_empty()
    }

    pub fn len(&self) -> usize {
        self.persistent.len() + self.one_shot.len()
    }
}

pub struct ListenerRegistry<P> {
    persistent: HashMap<EventName, ListenerSeq<P>>,
    one_shot: HashMap<EventName, ListenerSeq<P>>,
    next_id: u64,
}

impl<P> ListenerRegistry<P> {
    pub fn new() -> Self {
        Self {
            persistent: HashMap::new(),
            one_shot: HashMap::new(),
            next_id: 1,
        }
    }

    fn map(&self, kind: ListenerKind) -> &HashMap<EventName, ListenerSeq<P>> {
        match kind {
            ListenerKind::Persistent => &self.persistent,
            ListenerKind::OneShot => &self.one_shot,
        }
    }

    fn map_mut(&mut self, kind: ListenerKind) -> &mut HashMap<EventName, ListenerSeq<P>> {
        match kind {
            ListenerKind::Persistent => &mut self.persistent,
            ListenerKind::OneShot => &mut self.one_shot,
        }
    }

    /// Appends a registration. The same listener may be added any number of
    /// times; each registration is invoked separately.
    pub fn add_listener(&mut self, event: EventName, listener: Listener<P>, kind: ListenerKind) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;

        let entry = ListenerEntry {
            id,
            event: event.clone(),
            listener,
            kind,
        };
        self.map_mut(kind).entry(event).or_default().push(entry);

        trace!(?id, ?kind, "registered listener entry");
        id
    }

    /// Removes every registration of `listener` for `event`, both kinds.
    /// Returns how many entries were dropped.
    pub fn remove_listener(&mut self, event: &str, listener: &Listener<P>) -> usize {
        let mut removed = 0;
        for kind in [ListenerKind::Persistent, ListenerKind::OneShot] {
            let map = self.map_mut(kind);
            if let Some(seq) = map.get_mut(event) {
                let before = seq.len();
                seq.retain(|entry| entry.listener != *listener);
                removed += before - seq.len();
                if seq.is_empty() {
                    map.remove(event);
                }
            }
        }
        removed
    }

    /// Clears one event, or the whole registry when `event` is `None`.
    pub fn remove_all_listeners(&mut self, event: Option<&str>) -> usize {
        match event {
            Some(event) => {
                let persistent = self.persistent.remove(event).map_or(0, |seq| seq.len());
                let one_shot = self.one_shot.remove(event).map_or(0, |seq| seq.len());
                persistent + one_shot
            }
            None => {
                let total = self.total();
                self.persistent.clear();
                self.one_shot.clear();
                total
            }
        }
    }

    /// Persistent plus one-shot registrations for `event`, 0 when unknown.
    pub fn count(&self, event: &str) -> usize {
        let persistent = self.persistent.get(event).map_or(0, |seq| seq.len());
        let one_shot = self.one_shot.get(event).map_or(0, |seq| seq.len());
        persistent + one_shot
    }

    pub fn snapshot(&self, event: &str) -> Snapshot<P> {
        Snapshot {
            persistent: self.persistent.get(event).cloned().unwrap_or_default(),
            one_shot: self.one_shot.get(event).cloned().unwrap_or_default(),
        }
    }

    /// Whether the registration behind `entry` is still present.
    pub fn is_live(&self, entry: &ListenerEntry<P>) -> bool {
        self.map(entry.kind)
            .get(entry.event.as_str())
            .is_some_and(|seq| seq.iter().any(|e| e.id == entry.id))
    }

    /// Evicts one one-shot registration by identity. Returns `false` when it
    /// was already gone (removed by `off` or fired by a nested emission).
    pub fn take_one_shot(&mut self, event: &str, id: EntryId) -> bool {
        let Some(seq) = self.one_shot.get_mut(event) else {
            return false;
        };
        let Some(position) = seq.iter().position(|entry| entry.id == id) else {
            return false;
        };
        seq.remove(position);
        if seq.is_empty() {
            self.one_shot.remove(event);
        }
        true
    }

    /// Events with at least one registration, sorted.
    pub fn event_names(&self) -> Vec<EventName> {
        let mut names: Vec<EventName> = self
            .persistent
            .keys()
            .chain(self.one_shot.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn total(&self) -> usize {
        self.persistent.values().map(|seq| seq.len()).sum::<usize>()
            + self.one_shot.values().map(|seq| seq.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.persistent.is_empty() && self.one_shot.is_empty()
    }
}

impl<P> Default for ListenerRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> EventName {
        EventName::new(s)
    }

    fn noop() -> Listener<u32> {
        Listener::from_fn(|_| {})
    }

    #[test]
    fn test_add_and_count() {
        let mut registry = ListenerRegistry::new();
        let l1 = noop();

        registry.add_listener(name("x"), l1.clone(), ListenerKind::Persistent);
        registry.add_listener(name("x"), l1.clone(), ListenerKind::Persistent);
        registry.add_listener(name("x"), noop(), ListenerKind::OneShot);

        assert_eq!(registry.count("x"), 3);
        assert_eq!(registry.count("y"), 0);
        assert_eq!(registry.total(), 3);
    }

    #[test]
    fn test_remove_listener_removes_every_match() {
        let mut registry = ListenerRegistry::new();
        let target = noop();
        let other = noop();

        registry.add_listener(name("x"), target.clone(), ListenerKind::Persistent);
        registry.add_listener(name("x"), other.clone(), ListenerKind::Persistent);
        registry.add_listener(name("x"), target.clone(), ListenerKind::OneShot);
        registry.add_listener(name("x"), target.clone(), ListenerKind::Persistent);

        assert_eq!(registry.remove_listener("x", &target), 3);
        assert_eq!(registry.count("x"), 1);
        assert_eq!(registry.remove_listener("x", &target), 0);
        assert_eq!(registry.remove_listener("missing", &target), 0);
    }

    #[test]
    fn test_remove_all_for_one_event() {
        let mut registry = ListenerRegistry::new();
        registry.add_listener(name("a"), noop(), ListenerKind::Persistent);
        registry.add_listener(name("a"), noop(), ListenerKind::OneShot);
        registry.add_listener(name("b"), noop(), ListenerKind::Persistent);

        assert_eq!(registry.remove_all_listeners(Some("a")), 2);
        assert_eq!(registry.count("a"), 0);
        assert_eq!(registry.count("b"), 1);

        assert_eq!(registry.remove_all_listeners(None), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_from_registry() {
        let mut registry = ListenerRegistry::new();
        let l1 = noop();
        registry.add_listener(name("x"), l1.clone(), ListenerKind::Persistent);

        let snapshot = registry.snapshot("x");
        registry.remove_listener("x", &l1);

        assert_eq!(snapshot.persistent.len(), 1);
        assert!(!registry.is_live(&snapshot.persistent[0]));
        assert!(registry.snapshot("x").is_empty());
    }

    #[test]
    fn test_take_one_shot_by_identity() {
        let mut registry = ListenerRegistry::new();
        let l1 = noop();
        let first = registry.add_listener(name("x"), l1.clone(), ListenerKind::OneShot);
        let second = registry.add_listener(name("x"), l1.clone(), ListenerKind::OneShot);

        assert!(registry.take_one_shot("x", first));
        assert!(!registry.take_one_shot("x", first));
        assert_eq!(registry.count("x"), 1);
        assert!(registry.take_one_shot("x", second));
        assert!(registry.event_names().is_empty());
    }

    #[test]
    fn test_event_names_sorted_and_unique() {
        let mut registry = ListenerRegistry::new();
        registry.add_listener(name("b"), noop(), ListenerKind::Persistent);
        registry.add_listener(name("a"), noop(), ListenerKind::OneShot);
        registry.add_listener(name("b"), noop(), ListenerKind::OneShot);

        assert_eq!(registry.event_names(), vec![name("a"), name("b")]);
    }
}
