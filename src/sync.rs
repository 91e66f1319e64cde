//! Per-class spin lock for the central cache.
//!
//! Central-list critical sections are a handful of pointer swaps, so a
//! test-and-set lock with a scheduler yield between attempts is cheaper than
//! a full mutex. Acquisition is an `Acquire` swap and release a `Release`
//! store; the RAII guard releases on every exit path, unwinding included.

use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;

pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire the lock, yielding the scheduler between failed attempts.
    #[inline]
    pub fn lock(&self) -> SpinGuard<'_> {
        while self.locked.swap(true, Ordering::Acquire) {
            thread::yield_now();
        }
        SpinGuard { lock: self }
    }
}

pub struct SpinGuard<'a> {
    lock: &'a SpinLock,
}

impl Drop for SpinGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
