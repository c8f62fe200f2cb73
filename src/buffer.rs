//! Bounded producer/consumer buffer.
//!
//! The buffer owns the FIFO of pending records. The driver fills it during
//! the load phase, sets its capacity once, and then the worker pool drains
//! it with non-blocking `pull_one` calls. All mutation goes through a
//! single mutex, so concurrent pulls never hand out the same record twice.
//!
//! Crossing the capacity threshold publishes advisory notifications on two
//! single-slot channels:
//!
//! - **full**: an insert left the buffer holding exactly `capacity` records
//! - **empty**: the first pull that starts from a buffer holding
//!   `capacity` or more; it re-arms once an insert fills the buffer back
//!   to capacity
//!
//! Publishing never blocks. A notification that finds its slot occupied is
//! dropped, so observers see at most one pending notice of each kind. The
//! notifications carry no correctness weight; nothing in the pipeline waits
//! on them.

use crate::Record;
use crate::error::BufferError;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Which capacity crossing a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSignal {
    Full,
    Empty,
}

/// Counters describing what happened to a buffer over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Records appended with `insert`.
    pub inserted: usize,
    /// Records handed out by `pull_one`.
    pub pulled: usize,
    /// Times the full condition was met.
    pub full_raised: usize,
    /// Times the buffer was drained down across the capacity threshold.
    pub empty_raised: usize,
}

/// One notification channel: the sending half plus a receiver kept for
/// handing out to observers.
struct SignalSlot {
    tx: Sender<BufferSignal>,
    rx: Receiver<BufferSignal>,
}

impl SignalSlot {
    fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Publish without blocking; a full slot drops the notice.
    fn publish(&self, signal: BufferSignal) {
        match self.tx.try_send(signal) {
            Ok(()) => tracing::debug!(?signal, "buffer signal published"),
            Err(TrySendError::Full(_)) => tracing::trace!(?signal, "buffer signal dropped"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

struct BufferState {
    items: VecDeque<Record>,
    capacity: Option<usize>,
    // Set when capacity is assigned and on every full crossing; cleared by
    // the pull that raises the empty notification.
    empty_armed: bool,
    stats: BufferStats,
    // None once the buffer is shut down; dropping the slots disconnects
    // every observer.
    full: Option<SignalSlot>,
    empty: Option<SignalSlot>,
}

impl BufferState {
    fn is_closed(&self) -> bool {
        self.full.is_none()
    }
}

/// Shared FIFO of pending records with a capacity threshold.
pub struct BoundedBuffer {
    state: Mutex<BufferState>,
}

impl BoundedBuffer {
    /// Create an empty, open buffer with no capacity set.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BufferState {
                items: VecDeque::new(),
                capacity: None,
                empty_armed: false,
                stats: BufferStats::default(),
                full: Some(SignalSlot::new()),
                empty: Some(SignalSlot::new()),
            }),
        }
    }

    /// Append a record at the tail.
    ///
    /// Raises the full notification when the insert brings the length to
    /// exactly the configured capacity.
    pub fn insert(&self, record: Record) -> Result<(), BufferError> {
        let mut state = self.state.lock();
        if state.is_closed() {
            return Err(BufferError::Closed);
        }

        state.items.push_back(record);
        state.stats.inserted += 1;

        if state.capacity == Some(state.items.len()) {
            state.empty_armed = true;
            state.stats.full_raised += 1;
            if let Some(slot) = &state.full {
                slot.publish(BufferSignal::Full);
            }
        }
        Ok(())
    }

    /// Remove and return the head record, or `None` when there is nothing
    /// left to hand out (empty or closed). Never blocks.
    ///
    /// Raises the empty notification when the buffer held at least
    /// `capacity` records before the removal, once per crossing.
    pub fn pull_one(&self) -> Option<Record> {
        let mut state = self.state.lock();
        if state.is_closed() {
            return None;
        }

        let before = state.items.len();
        let record = state.items.pop_front()?;
        state.stats.pulled += 1;

        if let Some(capacity) = state.capacity
            && before >= capacity
            && state.empty_armed
        {
            state.empty_armed = false;
            state.stats.empty_raised += 1;
            if let Some(slot) = &state.empty {
                slot.publish(BufferSignal::Empty);
            }
        }
        Some(record)
    }

    /// Set the capacity threshold. Allowed once, before any pull.
    pub fn set_capacity(&self, capacity: usize) -> Result<(), BufferError> {
        let mut state = self.state.lock();
        if state.is_closed() {
            return Err(BufferError::Closed);
        }
        if let Some(existing) = state.capacity {
            return Err(BufferError::CapacityAlreadySet(existing));
        }
        if state.stats.pulled > 0 {
            return Err(BufferError::CapacityAfterPull);
        }
        state.capacity = Some(capacity);
        state.empty_armed = true;
        Ok(())
    }

    /// Close the buffer and drop its notification channels.
    ///
    /// Shutdown belongs to the single owner and happens once; a second call
    /// reports `Closed`.
    pub fn shutdown(&self) -> Result<(), BufferError> {
        let mut state = self.state.lock();
        if state.is_closed() {
            return Err(BufferError::Closed);
        }
        state.full = None;
        state.empty = None;
        tracing::debug!(
            remaining = state.items.len(),
            stats = ?state.stats,
            "buffer shut down"
        );
        Ok(())
    }

    /// Receiver for full notifications. `None` after shutdown.
    pub fn full_signals(&self) -> Option<Receiver<BufferSignal>> {
        self.state.lock().full.as_ref().map(|slot| slot.rx.clone())
    }

    /// Receiver for empty notifications. `None` after shutdown.
    pub fn empty_signals(&self) -> Option<Receiver<BufferSignal>> {
        self.state.lock().empty.as_ref().map(|slot| slot.rx.clone())
    }

    pub fn capacity(&self) -> Option<usize> {
        self.state.lock().capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().is_closed()
    }

    /// Snapshot of the lifetime counters.
    pub fn stats(&self) -> BufferStats {
        self.state.lock().stats
    }
}

impl Default for BoundedBuffer {
    fn default() -> Self {
        Self::new()
    }
}
