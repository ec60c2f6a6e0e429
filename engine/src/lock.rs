//! A simple reader/writer lock with writer reentrancy.
//!
//! The read side may be held by any number of threads at once as long as no
//! writer is active; the write side is exclusive. The active writer may keep
//! acquiring read or write access while it holds the lock. There is no
//! fairness guarantee in either direction: a steady stream of readers can
//! starve a writer and vice versa.

use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};

pub struct ReadWriteLock {
    state: Mutex<LockState>,
    waiters: Condvar,
}

#[derive(Default)]
struct LockState {
    readers: usize,
    writers: usize,
    active_writer: Option<ThreadId>,
}

impl LockState {
    fn is_active_writer(&self) -> bool {
        self.active_writer == Some(thread::current().id())
    }
}

impl ReadWriteLock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            waiters: Condvar::new(),
        }
    }

    /// Acquires read access, blocking while a writer other than the calling
    /// thread is active.
    pub fn lock_read(&self) {
        tracing::trace!("acquiring read lock");
        let mut state = self.state.lock();
        while state.writers > 0 && !state.is_active_writer() {
            self.waiters.wait(&mut state);
        }
        debug_assert!(state.writers == 0 || state.is_active_writer());
        state.readers += 1;
    }

    /// Releases read access, waking waiters once the reader count hits zero.
    ///
    /// # Panics
    ///
    /// Panics if no read lock is outstanding. Unlocking without a matching
    /// lock is a programmer error and surfaces loudly.
    pub fn unlock_read(&self) {
        let mut state = self.state.lock();
        if state.readers == 0 {
            panic!("read unlock without a matching read lock");
        }
        state.readers -= 1;
        if state.readers == 0 {
            self.waiters.notify_all();
        }
    }

    /// Acquires write access, blocking while any reader or a different
    /// writer is active, and records the calling thread as the active
    /// writer.
    pub fn lock_write(&self) {
        tracing::trace!("acquiring write lock");
        let mut state = self.state.lock();
        while (state.writers > 0 || state.readers > 0) && !state.is_active_writer() {
            self.waiters.wait(&mut state);
        }
        debug_assert!((state.writers == 0 && state.readers == 0) || state.is_active_writer());
        state.writers += 1;
        state.active_writer = Some(thread::current().id());
    }

    /// Releases write access. The active-writer identity is cleared and
    /// waiters are woken only once both counts reach zero, so a writer that
    /// still holds reentrant reads keeps the lock.
    ///
    /// # Panics
    ///
    /// Panics if no write lock is outstanding, or if the caller is not the
    /// active writer.
    pub fn unlock_write(&self) {
        let mut state = self.state.lock();
        if state.writers == 0 {
            panic!("write unlock without a matching write lock");
        }
        if !state.is_active_writer() {
            panic!("write unlock from a thread that does not hold the write lock");
        }
        state.writers -= 1;
        if state.writers == 0 && state.readers == 0 {
            state.active_writer = None;
            self.waiters.notify_all();
        }
    }

    /// The number of active readers.
    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    /// The number of active writers (> 1 only through reentrancy).
    pub fn writers(&self) -> usize {
        self.state.lock().writers
    }

    /// Whether the calling thread is the active writer.
    pub fn is_active_writer(&self) -> bool {
        self.state.lock().is_active_writer()
    }

    /// Read access scoped to a guard, released on drop even on panic.
    pub fn read(&self) -> ReadGuard<'_> {
        self.lock_read();
        ReadGuard { lock: self }
    }

    /// Write access scoped to a guard, released on drop even on panic.
    pub fn write(&self) -> WriteGuard<'_> {
        self.lock_write();
        WriteGuard { lock: self }
    }
}

impl Default for ReadWriteLock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ReadGuard<'a> {
    lock: &'a ReadWriteLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock_read();
    }
}

pub struct WriteGuard<'a> {
    lock: &'a ReadWriteLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock_write();
    }
}
