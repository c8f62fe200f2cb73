//! Result collector.
//!
//! Workers append matching records concurrently. Once every worker has
//! stopped, the driver seals the collector (the terminal signal) and then
//! finalizes it. `finalize` consumes the collector, so the sorted snapshot
//! is produced exactly once and nothing can be inserted afterwards.

use crate::Record;
use crate::error::CollectorError;
use parking_lot::Mutex;

struct CollectorState {
    records: Vec<Record>,
    sealed: bool,
}

/// Append-only accumulator of matched records.
pub struct ResultCollector {
    state: Mutex<CollectorState>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CollectorState {
                records: Vec::new(),
                sealed: false,
            }),
        }
    }

    /// Append a record. Safe to call from any number of workers.
    pub fn insert(&self, record: Record) -> Result<(), CollectorError> {
        let mut state = self.state.lock();
        if state.sealed {
            return Err(CollectorError::Sealed);
        }
        state.records.push(record);
        Ok(())
    }

    /// Deliver the terminal signal: no further inserts will be accepted.
    pub fn seal(&self) -> Result<(), CollectorError> {
        let mut state = self.state.lock();
        if state.sealed {
            return Err(CollectorError::AlreadySealed);
        }
        state.sealed = true;
        tracing::debug!(collected = state.records.len(), "collector sealed");
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.state.lock().sealed
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// Sort the collection by `number` and hand it back.
    ///
    /// The sort is stable: records sharing a `number` keep the order in
    /// which they were inserted.
    pub fn finalize(self) -> Vec<Record> {
        let mut records = self.state.into_inner().records;
        records.sort_by_key(Record::number);
        records
    }
}

impl Default for ResultCollector {
    fn default() -> Self {
        Self::new()
    }
}
