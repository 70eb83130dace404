//! Background thread that keeps rewriting locked values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::error::Result;
use crate::memory::MemoryTarget;
use crate::shutdown::ShutdownSignal;
use crate::value::TypedValue;

/// An address the locker keeps writing, with the value it writes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LockedEntry {
    pub address: u64,
    pub value: TypedValue,
}

/// Counters accumulated by the locker thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockStats {
    pub passes: u64,
    pub writes: u64,
    pub failures: u64,
}

struct LockState {
    running: bool,
    entries: Vec<LockedEntry>,
}

struct Shared {
    state: Mutex<LockState>,
    wake: ShutdownSignal,
    passes: AtomicU64,
    writes: AtomicU64,
    failures: AtomicU64,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owner of the locker thread and the shared locked list.
///
/// Every read or mutation of the list takes the same mutex as a rewrite
/// pass, so a pass never sees a half-updated list.
pub struct Locker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Locker {
    pub fn spawn(target: Arc<dyn MemoryTarget>, interval: Duration) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(LockState {
                running: true,
                entries: Vec::new(),
            }),
            wake: ShutdownSignal::new(),
            passes: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("regiondig-locker".into())
            .spawn(move || run(thread_shared, target, interval))?;

        debug!("Locker started ({}ms interval)", interval.as_millis());
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Add entries, replacing the value of addresses already locked.
    ///
    /// Returns the number of entries given.
    pub fn lock<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = LockedEntry>,
    {
        let mut state = self.shared.state();
        let mut count = 0;
        for entry in entries {
            match state.entries.iter_mut().find(|e| e.address == entry.address) {
                Some(existing) => existing.value = entry.value,
                None => state.entries.push(entry),
            }
            count += 1;
        }
        count
    }

    pub fn unlock(&self, address: u64) -> bool {
        let mut state = self.shared.state();
        let before = state.entries.len();
        state.entries.retain(|e| e.address != address);
        state.entries.len() != before
    }

    /// Drop every locked entry, returning how many there were
    pub fn unlock_all(&self) -> usize {
        let mut state = self.shared.state();
        let count = state.entries.len();
        state.entries.clear();
        count
    }

    /// Copy of the locked list
    pub fn entries(&self) -> Vec<LockedEntry> {
        self.shared.state().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.shared.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            passes: self.shared.passes.load(Ordering::Relaxed),
            writes: self.shared.writes.load(Ordering::Relaxed),
            failures: self.shared.failures.load(Ordering::Relaxed),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        self.shared.state().running = false;
        self.shared.wake.trigger();
        if handle.join().is_err() {
            debug!("Locker thread panicked");
        }

        let stats = self.stats();
        info!(
            "Locker stopped after {} passes ({} writes, {} failed)",
            stats.passes, stats.writes, stats.failures
        );
    }
}

impl Drop for Locker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: Arc<Shared>, target: Arc<dyn MemoryTarget>, interval: Duration) {
    loop {
        {
            let state = shared.state();
            if !state.running {
                break;
            }
            for entry in &state.entries {
                match target.write_value(entry.address, &entry.value) {
                    Ok(()) => {
                        shared.writes.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        trace!("Lock write failed: {}", e);
                        shared.failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            shared.passes.fetch_add(1, Ordering::Relaxed);
        }

        if shared.wake.wait(interval) {
            break;
        }
    }
}
