//! Change notifications and the bounded event buffer.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Operation reported by the notification backend.
///
/// Only writes are acted upon; everything else (creates, deletes,
/// renames, metadata changes) collapses to [`ChangeOp::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    /// File content was written.
    Write,

    /// Any other operation.
    Other,
}

impl From<notify::EventKind> for ChangeOp {
    fn from(kind: notify::EventKind) -> Self {
        match kind {
            notify::EventKind::Modify(notify::event::ModifyKind::Data(_))
            | notify::EventKind::Modify(notify::event::ModifyKind::Any) => Self::Write,
            _ => Self::Other,
        }
    }
}

/// A single change notification.
///
/// Immutable once created; duplicates are expected and harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Operation that produced the notification.
    pub op: ChangeOp,

    /// Path to the affected file.
    pub path: PathBuf,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(op: ChangeOp, path: impl Into<PathBuf>) -> Self {
        Self {
            op,
            path: path.into(),
        }
    }
}

/// Bounded buffer of pending change events.
///
/// Appends come from the notification backend's callback thread; drains
/// come from the control loop. Once full, new arrivals are dropped (and
/// counted), so a burst larger than the bound loses the excess while the
/// loop keeps making forward progress.
pub struct EventBuffer {
    events: Mutex<Vec<ChangeEvent>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl EventBuffer {
    /// Create a buffer holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Append an event, silently dropping it if the buffer is full.
    pub fn append(&self, event: ChangeEvent) {
        let mut events = self.lock();
        if events.len() < self.capacity {
            events.push(event);
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Move all buffered events into `scratch` and clear the buffer, as
    /// one atomic step with respect to concurrent appends.
    ///
    /// `scratch` is cleared first; its allocation is handed back to the
    /// buffer so steady-state draining does not reallocate.
    pub fn drain_into(&self, scratch: &mut Vec<ChangeEvent>) {
        scratch.clear();
        let mut events = self.lock();
        std::mem::swap(&mut *events, scratch);
    }

    /// Number of currently buffered events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of events dropped at capacity since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    // A poisoned lock still guards plain data; keep going.
    fn lock(&self) -> MutexGuard<'_, Vec<ChangeEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
