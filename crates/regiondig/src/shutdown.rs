use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A stop flag that supports interruptible waits.
///
/// The locker thread sleeps on this between rewrite passes, and the CLI
/// uses one to hold a lock until Ctrl-C.
pub struct ShutdownSignal {
    shutdown: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    /// Trigger the signal, waking all waiting threads.
    pub fn trigger(&self) {
        // Notify under the mutex so a waiter cannot miss the wake-up between
        // its flag check and going to sleep
        let _guard = self.mutex.lock();
        self.shutdown.store(true, Ordering::SeqCst);
        self.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Wait for `duration` or until the signal is triggered.
    ///
    /// Returns `true` if the signal was triggered, `false` on timeout.
    pub fn wait(&self, duration: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }

        let Ok(guard) = self.mutex.lock() else {
            return true;
        };
        match self
            .condvar
            .wait_timeout_while(guard, duration, |_| !self.is_shutdown())
        {
            Ok((_, timeout)) => !timeout.timed_out(),
            // Mutex poisoned, treat as shutdown
            Err(_) => true,
        }
    }

    /// Block until the signal is triggered.
    pub fn wait_forever(&self) {
        while !self.wait(Duration::from_secs(3600)) {}
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
