//! Pull-based worker pool.
//!
//! Each worker loops independently: check the stop flag, pull one record
//! from the buffer, test it, forward matches to the collector. A worker
//! ends when the flag is raised or when `pull_one` reports that nothing is
//! left. Because pulls never block, running out of work is enough to stop
//! every worker; no shutdown broadcast is needed while draining.
//!
//! Workers are scoped threads borrowing the buffer, collector and
//! predicate, so `run` returns only after all of them have joined.

use crate::buffer::BoundedBuffer;
use crate::collector::ResultCollector;
use crate::error::{CollectorError, PipelineError, Result};
use crate::predicate::Predicate;
use crossbeam_channel::{RecvTimeoutError, bounded};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Cooperative cancellation flag shared with the workers.
///
/// Workers check it once per loop iteration; an in-flight predicate
/// evaluation or insert is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every worker to stop at its next iteration.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// What a single worker did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker: usize,
    pub pulled: usize,
    pub matched: usize,
}

/// Outcome of one draining phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// One entry per worker, in spawn order.
    pub workers: Vec<WorkerStats>,
    /// True when the stop flag ended the phase rather than an empty buffer.
    pub stopped_early: bool,
}

impl PoolReport {
    /// Total records pulled across all workers.
    pub fn pulled(&self) -> usize {
        self.workers.iter().map(|w| w.pulled).sum()
    }

    /// Total records forwarded to the collector.
    pub fn matched(&self) -> usize {
        self.workers.iter().map(|w| w.matched).sum()
    }
}

/// A fixed-size pool of filter workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    size: usize,
    deadline: Option<Duration>,
}

impl WorkerPool {
    /// Create a pool of `size` workers. Zero is rejected.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(PipelineError::Config(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        Ok(Self {
            size,
            deadline: None,
        })
    }

    /// Raise the stop flag if draining takes longer than `deadline`.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Pool size matching the machine's available parallelism.
    pub fn default_size() -> usize {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run every worker to completion against `buffer`.
    ///
    /// Blocks until all workers have terminated. A worker panic is reported
    /// as `WorkerPanicked`; a collector that refuses inserts is reported as
    /// a collector error after the remaining workers have been stopped.
    pub fn run(
        &self,
        buffer: &BoundedBuffer,
        collector: &ResultCollector,
        predicate: &dyn Predicate,
        stop: &StopHandle,
    ) -> Result<PoolReport> {
        tracing::debug!(
            workers = self.size,
            predicate = predicate.name(),
            "starting worker pool"
        );

        let (done_tx, done_rx) = bounded::<()>(0);

        let joined = thread::scope(|s| {
            if let Some(deadline) = self.deadline {
                let stop = stop.clone();
                let done_rx = done_rx.clone();
                s.spawn(move || {
                    if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(deadline) {
                        tracing::warn!(?deadline, "drain deadline expired, stopping workers");
                        stop.stop();
                    }
                });
            }

            let handles: Vec<_> = (0..self.size)
                .map(|id| s.spawn(move || run_worker(id, buffer, collector, predicate, stop)))
                .collect();

            let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
            // Wakes the watchdog.
            drop(done_tx);
            joined
        });

        let mut report = PoolReport {
            workers: Vec::with_capacity(self.size),
            stopped_early: stop.is_stopped(),
        };
        for (id, outcome) in joined.into_iter().enumerate() {
            let stats = outcome.map_err(|_| PipelineError::WorkerPanicked { worker: id })??;
            report.workers.push(stats);
        }

        tracing::debug!(
            pulled = report.pulled(),
            matched = report.matched(),
            stopped_early = report.stopped_early,
            "worker pool finished"
        );
        Ok(report)
    }
}

fn run_worker(
    id: usize,
    buffer: &BoundedBuffer,
    collector: &ResultCollector,
    predicate: &dyn Predicate,
    stop: &StopHandle,
) -> std::result::Result<WorkerStats, CollectorError> {
    let mut stats = WorkerStats {
        worker: id,
        ..WorkerStats::default()
    };

    while !stop.is_stopped() {
        let Some(record) = buffer.pull_one() else {
            break;
        };
        stats.pulled += 1;

        if predicate.matches(&record) {
            if let Err(e) = collector.insert(record) {
                stop.stop();
                return Err(e);
            }
            stats.matched += 1;
        }
    }

    tracing::trace!(
        worker = id,
        pulled = stats.pulled,
        matched = stats.matched,
        "worker finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;
    use crate::predicate::{EvenNumber, FnPredicate};

    fn loaded(n: i64) -> BoundedBuffer {
        let buffer = BoundedBuffer::new();
        for i in 0..n {
            buffer.insert(Record::new(format!("r{i}"), i, 0.0)).unwrap();
        }
        buffer.set_capacity(n as usize / 2).unwrap();
        buffer
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_default_size_is_positive() {
        assert!(WorkerPool::default_size() >= 1);
    }

    #[test]
    fn test_single_worker_drains_everything() {
        let buffer = loaded(10);
        let collector = ResultCollector::new();
        let report = WorkerPool::new(1)
            .unwrap()
            .run(&buffer, &collector, &EvenNumber, &StopHandle::new())
            .unwrap();

        assert_eq!(report.pulled(), 10);
        assert_eq!(report.matched(), 5);
        assert!(!report.stopped_early);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_six_workers_match_the_same_set() {
        let buffer = loaded(1_000);
        let collector = ResultCollector::new();
        let report = WorkerPool::new(6)
            .unwrap()
            .run(&buffer, &collector, &EvenNumber, &StopHandle::new())
            .unwrap();

        assert_eq!(report.workers.len(), 6);
        assert_eq!(report.pulled(), 1_000);
        let numbers: Vec<i64> = collector.finalize().iter().map(Record::number).collect();
        assert_eq!(numbers, (0..1_000).step_by(2).collect::<Vec<_>>());
    }

    #[test]
    fn test_stop_before_start_pulls_nothing() {
        let buffer = loaded(10);
        let collector = ResultCollector::new();
        let stop = StopHandle::new();
        stop.stop();

        let report = WorkerPool::new(3)
            .unwrap()
            .run(&buffer, &collector, &EvenNumber, &stop)
            .unwrap();
        assert_eq!(report.pulled(), 0);
        assert!(report.stopped_early);
        assert_eq!(buffer.len(), 10);
    }

    #[test]
    fn test_deadline_stops_slow_workers() {
        let buffer = loaded(1_000);
        let collector = ResultCollector::new();
        let slow = FnPredicate::new("SLOW", |_: &Record| {
            thread::sleep(Duration::from_millis(5));
            true
        });

        let report = WorkerPool::new(1)
            .unwrap()
            .with_deadline(Some(Duration::from_millis(30)))
            .run(&buffer, &collector, &slow, &StopHandle::new())
            .unwrap();

        assert!(report.stopped_early);
        assert!(report.pulled() < 1_000);
        assert_eq!(collector.len(), report.matched());
    }

    #[test]
    fn test_deadline_not_hit_on_fast_run() {
        let buffer = loaded(100);
        let collector = ResultCollector::new();
        let report = WorkerPool::new(2)
            .unwrap()
            .with_deadline(Some(Duration::from_secs(30)))
            .run(&buffer, &collector, &EvenNumber, &StopHandle::new())
            .unwrap();
        assert!(!report.stopped_early);
        assert_eq!(report.pulled(), 100);
    }

    #[test]
    fn test_sealed_collector_surfaces_error() {
        let buffer = loaded(10);
        let collector = ResultCollector::new();
        collector.seal().unwrap();

        let err = WorkerPool::new(2)
            .unwrap()
            .run(&buffer, &collector, &EvenNumber, &StopHandle::new())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Collector(CollectorError::Sealed)
        ));
    }

    #[test]
    fn test_worker_panic_reported() {
        let buffer = loaded(4);
        let collector = ResultCollector::new();
        let boom = FnPredicate::new("BOOM", |r: &Record| {
            if r.number() == 2 {
                panic!("predicate failure");
            }
            false
        });

        let err = WorkerPool::new(1)
            .unwrap()
            .run(&buffer, &collector, &boom, &StopHandle::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::WorkerPanicked { worker: 0 }));
    }
}
