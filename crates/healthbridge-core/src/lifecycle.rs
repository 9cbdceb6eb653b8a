//! View lifetimes and request tickets.
//!
//! Every async completion carries the [`Ticket`] issued when its request started.
//! The owning view folds the result only if it is still alive and the ticket is the
//! newest one it issued; anything else is a stale completion and is dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Liveness + sequence for one mounted view (or one request lane within a view).
#[derive(Debug, Clone)]
pub struct ViewLifetime {
    alive: Arc<AtomicBool>,
    latest: Arc<AtomicU64>,
}

impl ViewLifetime {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start a request. Supersedes any ticket issued before it.
    pub fn issue(&self) -> Ticket {
        let seq = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        Ticket { seq }
    }

    /// True only while alive and `ticket` is the newest issued.
    pub fn accepts(&self, ticket: &Ticket) -> bool {
        self.alive.load(Ordering::Acquire) && self.latest.load(Ordering::Acquire) == ticket.seq
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// End the lifetime. Every outstanding ticket becomes stale.
    pub fn dispose(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Default for ViewLifetime {
    fn default() -> Self {
        Self::new()
    }
}

/// Ends one or more lifetimes from outside the view, e.g. from a task that handles
/// navigation while the view is awaiting a lookup.
#[derive(Debug, Clone, Default)]
pub struct DismissHandle {
    lanes: Vec<ViewLifetime>,
}

impl DismissHandle {
    pub fn new(lanes: Vec<ViewLifetime>) -> Self {
        Self { lanes }
    }

    pub fn dismiss(&self) {
        for lane in &self.lanes {
            lane.dispose();
        }
    }
}
