use std::iter::FusedIterator;

use super::snapshot::Snapshot;

/// Ordered, append-only sequence of snapshots.
///
/// Unbounded for batch investigations. With a capacity it behaves as a ring
/// buffer over a fixed array: once full, each push overwrites the oldest slot
/// and hands the evicted snapshot back.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    slots: Vec<Snapshot>,
    head: usize,
    capacity: Option<usize>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl SnapshotStore {
    pub fn unbounded() -> Self {
        Self {
            slots: Vec::new(),
            head: 0,
            capacity: None,
        }
    }

    /// A ring buffer holding at most `capacity` snapshots (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn push(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        match self.capacity {
            Some(cap) if self.slots.len() == cap => {
                let evicted = std::mem::replace(&mut self.slots[self.head], snapshot);
                self.head = (self.head + 1) % cap;
                Some(evicted)
            }
            _ => {
                self.slots.push(snapshot);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The `index`-th surviving snapshot, 0 being the oldest.
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        if index >= self.slots.len() {
            return None;
        }
        self.slots.get((self.head + index) % self.slots.len())
    }

    pub fn first(&self) -> Option<&Snapshot> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            store: self,
            front: 0,
            back: self.len(),
        }
    }
}

impl FromIterator<Snapshot> for SnapshotStore {
    fn from_iter<I: IntoIterator<Item = Snapshot>>(iter: I) -> Self {
        let mut store = SnapshotStore::unbounded();
        for snapshot in iter {
            store.push(snapshot);
        }
        store
    }
}

pub struct Iter<'a> {
    store: &'a SnapshotStore,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Snapshot;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.store.get(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.store.get(self.back)
    }
}

impl ExactSizeIterator for Iter<'_> {}
impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a SnapshotStore {
    type Item = &'a Snapshot;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
