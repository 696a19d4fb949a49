//! Ordered three-way reconciliation of daemon snapshots.
//!
//! Each poll replaces a whole entity family with the daemon's latest
//! snapshot; the [`Collection`] works out the minimal diff against what it
//! already holds so observers are told only what moved. Stored order always
//! mirrors daemon order after a reconcile.

use std::collections::HashMap;
use std::hash::Hash;

use remora_events::{ChangedRecord, FieldMask, ListDiff};

/// A record that can live in a [`Collection`]: it knows its identity key
/// and can describe which of its fields differ from a previous revision.
pub trait Reconcilable {
    type Key: Clone + Eq + Hash;

    /// Identity key, stable across snapshots.
    fn key(&self) -> Self::Key;

    /// Mask of fields that differ from `previous`. An empty mask means the
    /// two revisions are equivalent and no update is reported.
    fn changed_fields(&self, previous: &Self) -> FieldMask;
}

/// Keyed, ordered store for one entity family.
pub struct Collection<T: Reconcilable> {
    items: Vec<T>,
    index: HashMap<T::Key, usize>,
}

impl<T: Reconcilable> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Reconcilable> Collection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Stored records, in the order of the last reconciled snapshot.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Look up one record by key.
    #[must_use]
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.index.get(key).map(|&position| &self.items[position])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the stored records with `snapshot` and report the diff.
    ///
    /// Removals come first, in stored order; insertions and updates follow
    /// in snapshot order. Records whose changed-field mask is empty produce
    /// no update entry. When the snapshot repeats a key, the first
    /// occurrence wins and later duplicates are dropped.
    pub fn reconcile(&mut self, snapshot: Vec<T>) -> ListDiff<T::Key> {
        let mut fresh_index: HashMap<T::Key, usize> = HashMap::with_capacity(snapshot.len());
        let mut fresh_items: Vec<T> = Vec::with_capacity(snapshot.len());
        for record in snapshot {
            let key = record.key();
            if fresh_index.contains_key(&key) {
                continue;
            }
            fresh_index.insert(key, fresh_items.len());
            fresh_items.push(record);
        }

        let mut diff = ListDiff::empty();
        for record in &self.items {
            let key = record.key();
            if !fresh_index.contains_key(&key) {
                diff.removed.push(key);
            }
        }
        for record in &fresh_items {
            let key = record.key();
            match self.get(&key) {
                None => diff.inserted.push(key),
                Some(previous) => {
                    let fields = record.changed_fields(previous);
                    if !fields.is_empty() {
                        diff.updated.push(ChangedRecord { key, fields });
                    }
                }
            }
        }

        self.items = fresh_items;
        self.index = fresh_index;
        diff
    }

    /// Append a record that the daemon has acknowledged but not yet listed.
    /// Ignored when the key is already present; the next reconcile replaces
    /// it with the daemon's authoritative revision.
    pub fn insert_provisional(&mut self, record: T) -> bool {
        let key = record.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.items.len());
        self.items.push(record);
        true
    }

    /// Drop every stored record, reporting them all as removed.
    pub fn clear(&mut self) -> ListDiff<T::Key> {
        self.reconcile(Vec::new())
    }
}
