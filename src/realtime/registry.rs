//! Live connection registry
//!
//! Every open socket is registered here from the moment it is accepted until
//! it closes. All mutation and enumeration goes through one mutex which is
//! never held across an await point; callers iterate over a `snapshot()`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::Frame;

/// Opaque, process-unique connection identifier
pub type ConnectionHandle = u64;

/// A registered connection
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub handle: ConnectionHandle,
    /// Authenticated user, if the connection was authenticated
    pub principal: Option<i64>,
    /// Bounded queue drained by the connection's writer
    pub outbound: mpsc::Sender<Frame>,
    /// Cancelled when the connection must close
    pub close: CancellationToken,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    next_handle: AtomicU64,
    entries: Mutex<BTreeMap<ConnectionHandle, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Never fails; the returned handle is never reused.
    pub fn add(
        &self,
        principal: Option<i64>,
        outbound: mpsc::Sender<Frame>,
        close: CancellationToken,
    ) -> ConnectionHandle {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock().insert(
            handle,
            ConnectionEntry {
                handle,
                principal,
                outbound,
                close,
            },
        );
        handle
    }

    /// Deregister a connection and signal it to close.
    ///
    /// Idempotent: returns `false` if the handle was not registered.
    pub fn remove(&self, handle: ConnectionHandle) -> bool {
        let removed = self.lock().remove(&handle);
        match removed {
            Some(entry) => {
                entry.close.cancel();
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of every entry, ordered by handle
    pub fn snapshot(&self) -> Vec<ConnectionEntry> {
        self.lock().values().cloned().collect()
    }

    /// Registered handles in ascending order
    pub fn handles(&self) -> Vec<ConnectionHandle> {
        self.lock().keys().copied().collect()
    }

    pub fn contains(&self, handle: ConnectionHandle) -> bool {
        self.lock().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<ConnectionHandle, ConnectionEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
