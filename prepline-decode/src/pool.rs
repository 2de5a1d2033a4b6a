//! Preallocated accelerator memory pool
//!
//! Decode output buffers on the accelerator are carved out of a pool
//! sized from optional width/height preallocation hints. Reserving
//! already-available capacity is a lock-free commit; growth is
//! serialized under a mutex so concurrent batches never observe a torn
//! capacity state. The invariant held at all times: reported capacity
//! is at least the sum of committed reservations.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{Error, Result};

/// Statistics for an accelerator pool
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Current capacity in bytes
    pub capacity: usize,

    /// Bytes committed to live reservations
    pub committed: usize,

    /// Highest committed byte count observed
    pub peak_committed: usize,

    /// Number of growth operations performed
    pub grows: u64,
}

/// Growable accelerator memory pool with budgeted capacity
pub struct AcceleratorPool {
    /// Current capacity; only ever grows
    capacity: AtomicUsize,

    /// Bytes committed to live reservations
    committed: AtomicUsize,

    /// Serializes growth; never held for plain reservations
    grow_lock: Mutex<()>,

    /// Hard upper bound on capacity
    budget: usize,

    /// Highest committed value observed
    peak_committed: AtomicUsize,

    /// Growth operation count
    grows: AtomicU64,
}

impl AcceleratorPool {
    /// Create a pool with an initial capacity and a hard budget
    pub fn new(initial_capacity: usize, budget: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: AtomicUsize::new(initial_capacity.min(budget)),
            committed: AtomicUsize::new(0),
            grow_lock: Mutex::new(()),
            budget,
            peak_committed: AtomicUsize::new(0),
            grows: AtomicU64::new(0),
        })
    }

    /// Create a pool preallocated from expected-size hints
    ///
    /// A zero hint means no preallocation; the pool then grows on first
    /// use.
    pub fn with_hints(width_hint: u32, height_hint: u32, channels: u32, budget: usize) -> Arc<Self> {
        let initial = width_hint as usize * height_hint as usize * channels as usize;
        Self::new(initial, budget)
    }

    /// Whether the pool holds, or could grow to hold, `bytes` more
    pub fn can_accommodate(&self, bytes: usize) -> bool {
        self.committed
            .load(Ordering::SeqCst)
            .saturating_add(bytes)
            <= self.budget
    }

    /// Commit `bytes` against already-available capacity
    ///
    /// Lock-free; returns `None` when current capacity cannot satisfy
    /// the request without growing.
    pub fn try_reserve(self: &Arc<Self>, bytes: usize) -> Option<Reservation> {
        let mut committed = self.committed.load(Ordering::SeqCst);
        loop {
            let new_committed = committed.checked_add(bytes)?;
            if new_committed > self.capacity.load(Ordering::SeqCst) {
                return None;
            }
            match self.committed.compare_exchange(
                committed,
                new_committed,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    self.peak_committed
                        .fetch_max(new_committed, Ordering::SeqCst);
                    return Some(Reservation {
                        pool: Arc::clone(self),
                        bytes,
                    });
                }
                Err(actual) => committed = actual,
            }
        }
    }

    /// Commit `bytes`, growing the pool when needed
    ///
    /// Growth doubles the capacity (at least to the required size) up
    /// to the budget; concurrent growers are serialized, while samples
    /// whose capacity is already available commit without blocking.
    pub fn reserve(self: &Arc<Self>, bytes: usize) -> Result<Reservation> {
        if let Some(reservation) = self.try_reserve(bytes) {
            return Ok(reservation);
        }

        let _guard = self.grow_lock.lock().expect("pool grow lock poisoned");
        loop {
            // Another grower may have made room while we waited
            if let Some(reservation) = self.try_reserve(bytes) {
                return Ok(reservation);
            }
            let capacity = self.capacity.load(Ordering::SeqCst);
            let needed = self.committed.load(Ordering::SeqCst).saturating_add(bytes);
            if needed > self.budget {
                return Err(Error::CapacityExhausted {
                    requested: bytes,
                    capacity,
                });
            }
            let new_capacity = needed.max(capacity.saturating_mul(2)).min(self.budget);
            self.capacity.store(new_capacity, Ordering::SeqCst);
            self.grows.fetch_add(1, Ordering::SeqCst);
            debug!(
                old_capacity = capacity,
                new_capacity, "accelerator pool grew"
            );
        }
    }

    /// Current capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    /// Bytes committed to live reservations
    pub fn committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    /// Snapshot of pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity(),
            committed: self.committed(),
            peak_committed: self.peak_committed.load(Ordering::SeqCst),
            grows: self.grows.load(Ordering::SeqCst),
        }
    }

    fn release(&self, bytes: usize) {
        let prev = self.committed.fetch_sub(bytes, Ordering::SeqCst);
        debug_assert!(
            prev >= bytes,
            "released more than committed: prev={}, release={}",
            prev,
            bytes
        );
    }
}

/// A committed slice of pool capacity, released on drop
pub struct Reservation {
    pool: Arc<AcceleratorPool>,
    bytes: usize,
}

impl Reservation {
    /// Size of this reservation in bytes
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.pool.release(self.bytes);
    }
}
