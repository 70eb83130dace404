use serde::Serialize;
use tracing::debug;

use crate::memory::{MemoryTarget, RegionIterator, RegionReader};
use crate::value::{TypedValue, ValueKind};

/// A candidate address and the value it held when last observed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WatchEntry {
    pub address: u64,
    pub value: TypedValue,
}

/// Candidate addresses kept in ascending address order
#[derive(Debug, Default)]
pub struct Watchlist {
    entries: Vec<WatchEntry>,
}

impl Watchlist {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn get(&self, address: u64) -> Option<&WatchEntry> {
        self.entries
            .binary_search_by_key(&address, |e| e.address)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Kind of the first entry, if any
    pub fn kind(&self) -> Option<ValueKind> {
        self.entries.first().map(|e| e.value.kind())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Insert or update a single entry, keeping address order
    pub fn insert(&mut self, entry: WatchEntry) {
        match self
            .entries
            .binary_search_by_key(&entry.address, |e| e.address)
        {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// Replace the whole list in one step
    pub fn replace(&mut self, mut entries: Vec<WatchEntry>) {
        entries.sort_by_key(|e| e.address);
        entries.dedup_by_key(|e| e.address);
        self.entries = entries;
    }

    /// Observe the current value of every entry.
    ///
    /// Entries are grouped by the region that contains them and each such
    /// region is read once. The callback runs in ascending address order and
    /// gets `None` when the address lies outside every readable region or the
    /// read came back too short to hold the value.
    pub fn visit<T, F>(&self, target: &T, reader: &mut RegionReader, mut callback: F)
    where
        T: MemoryTarget + ?Sized,
        F: FnMut(&WatchEntry, Option<TypedValue>),
    {
        let Some(first) = self.entries.first() else {
            return;
        };

        let mut pending = self.entries.as_slice();
        for region in RegionIterator::starting_at(target, first.address) {
            while let Some((entry, rest)) = pending.split_first() {
                if entry.address >= region.mapped_base {
                    break;
                }
                callback(entry, None);
                pending = rest;
            }

            let inside = pending
                .iter()
                .take_while(|e| e.address < region.end())
                .count();
            if inside == 0 {
                if pending.is_empty() {
                    break;
                }
                continue;
            }
            let (group, rest) = pending.split_at(inside);
            pending = rest;

            if !region.is_readable() {
                group.iter().for_each(|e| callback(e, None));
                continue;
            }

            match reader.read(target, &region) {
                Ok(bytes) => {
                    for entry in group {
                        let offset = (entry.address - region.mapped_base) as usize;
                        let current = bytes
                            .get(offset..)
                            .and_then(|b| TypedValue::decode(entry.value.kind(), b));
                        callback(entry, current);
                    }
                }
                Err(e) => {
                    debug!("Skipping {} entries: {}", group.len(), e);
                    group.iter().for_each(|e| callback(e, None));
                }
            }

            if pending.is_empty() {
                break;
            }
        }

        pending.iter().for_each(|e| callback(e, None));
    }
}
