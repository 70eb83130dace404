//! The scan engine: one attached target, its watchlist and its locker.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::memory::{MemoryTarget, Region, RegionIterator, RegionReader};
use crate::scan::{LockedEntry, Locker, ScanOp, WatchEntry, Watchlist};
use crate::value::{TypedValue, ValueKind};

/// Lifecycle of an [`Engine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Unattached,
    Attached,
    Scanned,
    Narrowed,
}

/// Outcome of writing a value to every watched address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub written: usize,
    pub failed: usize,
}

/// Live scanner bound to at most one target at a time.
///
/// Engines are independent; nothing is shared between two instances.
pub struct Engine<T: MemoryTarget + 'static> {
    config: EngineConfig,
    target: Option<Arc<T>>,
    locker: Option<Locker>,
    watchlist: Watchlist,
    reader: RegionReader,
    state: EngineState,
    last_kind: ValueKind,
}

impl<T: MemoryTarget + 'static> Engine<T> {
    pub fn new(config: EngineConfig) -> Self {
        let watchlist = Watchlist::with_capacity(config.watchlist_capacity);
        Self {
            config,
            target: None,
            locker: None,
            watchlist,
            reader: RegionReader::new(),
            state: EngineState::Unattached,
            last_kind: ValueKind::I32,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    /// Bind the engine to `target` and start its locker thread.
    ///
    /// A previously attached target is detached first.
    pub fn attach(&mut self, target: Arc<T>) -> Result<()> {
        if self.target.is_some() {
            self.detach();
        }

        let locker = Locker::spawn(
            Arc::clone(&target) as Arc<dyn MemoryTarget>,
            self.config.lock_interval(),
        )?;
        self.locker = Some(locker);
        self.target = Some(target);
        self.state = EngineState::Attached;
        info!("Attached to target");
        Ok(())
    }

    /// Stop the locker, then release the target.
    pub fn detach(&mut self) {
        if let Some(mut locker) = self.locker.take() {
            locker.stop();
        }
        if self.target.take().is_some() {
            info!("Detached from target");
        }
        self.watchlist.clear();
        self.state = EngineState::Unattached;
    }

    /// Search every readable region for values satisfying `op value`.
    ///
    /// Replaces the watchlist and returns the number of candidates.
    pub fn scan(&mut self, op: ScanOp, value: TypedValue) -> Result<usize> {
        let target = self.live_target()?;
        let kind = value.kind();
        let width = kind.width();

        let mut found = Vec::with_capacity(self.config.watchlist_capacity);
        let mut regions = 0usize;
        let mut skipped = 0usize;

        for region in RegionIterator::new(&*target) {
            if !region.is_readable() {
                continue;
            }
            regions += 1;

            let bytes = match self.reader.read(&*target, &region) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("Skipping region {:#x}: {}", region.mapped_base, e);
                    skipped += 1;
                    continue;
                }
            };

            for (i, chunk) in bytes.chunks_exact(width).enumerate() {
                let Some(current) = TypedValue::decode(kind, chunk) else {
                    continue;
                };
                if op.matches(current.compare(&value)) {
                    found.push(WatchEntry {
                        address: region.mapped_base + (i * width) as u64,
                        value: current,
                    });
                }
            }
        }

        self.watchlist.replace(found);
        self.last_kind = kind;
        self.state = EngineState::Scanned;

        info!(
            "Scan {} {} matched {} addresses in {} regions ({} unreadable)",
            op,
            value,
            self.watchlist.len(),
            regions,
            skipped
        );
        Ok(self.watchlist.len())
    }

    /// Keep only watched addresses whose current value satisfies `op value`.
    pub fn narrow(&mut self, op: ScanOp, value: TypedValue) -> Result<usize> {
        let target = self.live_target()?;

        if let Some(kind) = self.watchlist.kind().filter(|&k| k != value.kind()) {
            warn!(
                "Narrowing {} entries with a {} value; values of different kinds compare by kind",
                kind,
                value.kind()
            );
        }

        let before = self.watchlist.len();
        let mut kept = Vec::with_capacity(before);
        self.watchlist
            .visit(&*target, &mut self.reader, |entry, current| {
                if let Some(current) = current.filter(|c| op.matches(c.compare(&value))) {
                    kept.push(WatchEntry {
                        address: entry.address,
                        value: current,
                    });
                }
            });

        self.watchlist.replace(kept);
        self.last_kind = value.kind();
        self.state = EngineState::Narrowed;

        info!(
            "Narrow {} {}: {} -> {} addresses",
            op,
            value,
            before,
            self.watchlist.len()
        );
        Ok(self.watchlist.len())
    }

    /// Watch `address` manually, typed like the last scan
    pub fn push(&mut self, address: u64) -> Result<()> {
        self.live_target()?;
        self.watchlist.insert(WatchEntry {
            address,
            value: TypedValue::zero(self.last_kind),
        });
        if self.state == EngineState::Attached {
            self.state = EngineState::Scanned;
        }
        Ok(())
    }

    /// Write `value` once to every watched address
    pub fn set(&mut self, value: TypedValue) -> Result<WriteReport> {
        let target = self.live_target()?;
        let mut report = WriteReport::default();

        for entry in self.watchlist.entries() {
            match target.write_value(entry.address, &value) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    debug!("{}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Set {}: {} written, {} failed",
            value, report.written, report.failed
        );
        Ok(report)
    }

    /// Lock the given watched addresses, optionally to `value` instead of
    /// their last observed value.
    ///
    /// Addresses that are not in the watchlist are ignored.
    pub fn lock(&mut self, addresses: &[u64], value: Option<TypedValue>) -> Result<usize> {
        self.live_target()?;
        let entries: Vec<LockedEntry> = addresses
            .iter()
            .filter_map(|&address| {
                let found = self.watchlist.get(address);
                if found.is_none() {
                    debug!("{:#x} is not watched, not locking", address);
                }
                found
            })
            .map(|entry| LockedEntry {
                address: entry.address,
                value: value.unwrap_or(entry.value),
            })
            .collect();

        Ok(self.locker()?.lock(entries))
    }

    /// Lock every watched address
    pub fn lock_all(&mut self, value: Option<TypedValue>) -> Result<usize> {
        let addresses: Vec<u64> = self.watchlist.entries().iter().map(|e| e.address).collect();
        self.lock(&addresses, value)
    }

    pub fn unlock_all(&mut self) -> Result<usize> {
        Ok(self.locker()?.unlock_all())
    }

    /// Report the current value of every watched address
    pub fn visit<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(u64, Option<TypedValue>),
    {
        let target = self.live_target()?;
        self.watchlist
            .visit(&*target, &mut self.reader, |entry, current| {
                callback(entry.address, current)
            });
        Ok(())
    }

    /// Snapshot of the locked list
    pub fn visit_locked(&self) -> Result<Vec<LockedEntry>> {
        Ok(self.locker()?.entries())
    }

    pub fn locker(&self) -> Result<&Locker> {
        self.locker.as_ref().ok_or(Error::NotAttached)
    }

    /// Committed regions of the attached target
    pub fn regions(&mut self) -> Result<Vec<Region>> {
        let target = self.live_target()?;
        Ok(RegionIterator::new(&*target).collect())
    }

    /// The attached target, detaching first if it has gone away
    fn live_target(&mut self) -> Result<Arc<T>> {
        let alive = match &self.target {
            Some(target) => target.is_alive(),
            None => return Err(Error::NotAttached),
        };

        if !alive {
            warn!("Target is gone, detaching");
            self.detach();
            return Err(Error::TargetLost);
        }

        self.target.clone().ok_or(Error::NotAttached)
    }
}

impl<T: MemoryTarget + 'static> Default for Engine<T> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<T: MemoryTarget + 'static> Drop for Engine<T> {
    fn drop(&mut self) {
        self.detach();
    }
}
