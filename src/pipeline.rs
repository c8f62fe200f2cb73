//! Pipeline driver.
//!
//! Wires the decoder, buffer, worker pool, collector and encoder together
//! and moves through four phases:
//!
//! - **Loading**: decode every input record into the buffer, then set the
//!   buffer capacity from the loaded count
//! - **Draining**: run the worker pool until every worker has stopped
//! - **Finalizing**: shut the buffer down, seal the collector, sort the
//!   matches and encode them
//! - **Done**: nothing further may run
//!
//! The collector is sealed only after the pool has joined every worker, so
//! no insert can race the terminal signal.

use crate::Record;
use crate::buffer::{BoundedBuffer, BufferStats};
use crate::codec::{DEFAULT_DELIMITER, RecordDecoder, RecordEncoder, SkipPolicy};
use crate::collector::ResultCollector;
use crate::error::{PipelineError, Result};
use crate::pool::{PoolReport, StopHandle, WorkerPool};
use crate::predicate::{EvenNumber, Predicate};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Where records are decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Path(PathBuf),
    Stdin,
}

impl InputSource {
    /// Human-readable name used in errors and logs.
    pub fn name(&self) -> String {
        match self {
            InputSource::Path(path) => path.display().to_string(),
            InputSource::Stdin => "(stdin)".to_string(),
        }
    }

    fn open(&self) -> io::Result<Box<dyn BufRead>> {
        Ok(match self {
            InputSource::Path(path) => Box::new(BufReader::new(File::open(path)?)),
            InputSource::Stdin => Box::new(io::stdin().lock()),
        })
    }
}

/// Where the encoded table is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Path(PathBuf),
    Stdout,
}

impl OutputSink {
    /// Human-readable name used in errors and logs.
    pub fn name(&self) -> String {
        match self {
            OutputSink::Path(path) => path.display().to_string(),
            OutputSink::Stdout => "(stdout)".to_string(),
        }
    }

    fn create(&self) -> io::Result<Box<dyn Write>> {
        Ok(match self {
            OutputSink::Path(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent)?;
                }
                Box::new(BufWriter::new(File::create(path)?))
            }
            OutputSink::Stdout => Box::new(io::stdout().lock()),
        })
    }
}

/// Settings for one pipeline run, resolved by the caller.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: InputSource,
    pub output: OutputSink,
    /// Number of pool workers; at least 1.
    pub workers: usize,
    /// Buffer capacity is `loaded / capacity_divisor`; at least 1.
    pub capacity_divisor: usize,
    pub delimiter: char,
    pub skip_policy: SkipPolicy,
    /// Stop the workers if draining runs longer than this.
    pub drain_deadline: Option<Duration>,
}

impl PipelineConfig {
    /// Default capacity divisor: the buffer threshold is half the load.
    pub const DEFAULT_CAPACITY_DIVISOR: usize = 2;

    pub fn new(input: InputSource, output: OutputSink) -> Self {
        Self {
            input,
            output,
            workers: WorkerPool::default_size(),
            capacity_divisor: Self::DEFAULT_CAPACITY_DIVISOR,
            delimiter: DEFAULT_DELIMITER,
            skip_policy: SkipPolicy::default(),
            drain_deadline: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PipelineError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.capacity_divisor == 0 {
            return Err(PipelineError::Config(
                "capacity divisor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Buffer capacity for a load of `loaded` records.
    pub fn capacity_for(&self, loaded: usize) -> usize {
        loaded / self.capacity_divisor
    }
}

/// Driver phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Draining,
    Finalizing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loading => "loading",
            Stage::Draining => "draining",
            Stage::Finalizing => "finalizing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Records decoded into the buffer.
    pub loaded: usize,
    /// Capacity threshold derived from `loaded`.
    pub capacity: usize,
    /// Records in the finalized collection.
    pub matched: usize,
    /// Rows written by the encoder.
    pub written: usize,
    pub workers: usize,
    pub predicate: String,
    pub stopped_early: bool,
    pub buffer: BufferStats,
    pub pool: PoolReport,
}

/// Single-use pipeline driver.
pub struct Pipeline {
    config: PipelineConfig,
    predicate: Box<dyn Predicate>,
    stop: StopHandle,
    stage: Stage,
    ran: bool,
}

impl Pipeline {
    /// Create a driver filtering with `EvenNumber`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            predicate: Box::new(EvenNumber),
            stop: StopHandle::new(),
            stage: Stage::Loading,
            ran: false,
        })
    }

    /// Replace the filter predicate.
    pub fn with_predicate(mut self, predicate: impl Predicate + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    /// Handle for stopping the workers from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run against the configured input and output.
    ///
    /// The input is opened before anything else happens, so an unreadable
    /// source aborts with no processing. The output is created only once the
    /// results are final.
    pub fn run(&mut self) -> Result<PipelineReport> {
        if self.ran {
            return Err(PipelineError::AlreadyRan);
        }
        let source_name = self.config.input.name();
        let input = self
            .config
            .input
            .open()
            .map_err(|io| PipelineError::DecodeIo {
                source_name: source_name.clone(),
                io,
            })?;

        let output = self.config.output.clone();
        let sink_name = output.name();
        self.execute(
            input,
            &source_name,
            |records, encoder| {
                let mut writer = output.create()?;
                encoder.encode(records, &mut writer)
            },
            &sink_name,
        )
    }

    /// Run against an arbitrary reader and writer, ignoring the configured
    /// input and output.
    pub fn run_with<R: BufRead, W: Write>(
        &mut self,
        input: R,
        output: &mut W,
    ) -> Result<PipelineReport> {
        self.execute(
            input,
            "(reader)",
            |records, encoder| encoder.encode(records, output),
            "(writer)",
        )
    }

    fn execute<R, E>(
        &mut self,
        input: R,
        source_name: &str,
        emit: E,
        sink_name: &str,
    ) -> Result<PipelineReport>
    where
        R: BufRead,
        E: FnOnce(&[Record], &RecordEncoder) -> io::Result<usize>,
    {
        if self.ran {
            return Err(PipelineError::AlreadyRan);
        }
        self.ran = true;

        let buffer = BoundedBuffer::new();
        let collector = ResultCollector::new();

        tracing::info!(
            stage = %self.stage,
            workers = self.config.workers,
            predicate = self.predicate.name(),
            "pipeline started"
        );
        let mut decoder = RecordDecoder::with_delimiter(input, self.config.delimiter);
        let mut loaded = 0;
        for item in decoder.by_ref() {
            let record = item.map_err(|io| PipelineError::DecodeIo {
                source_name: source_name.to_string(),
                io,
            })?;
            buffer.insert(record)?;
            loaded += 1;
        }
        let capacity = self.config.capacity_for(loaded);
        buffer.set_capacity(capacity)?;
        tracing::info!(
            source = source_name,
            loaded,
            skipped = decoder.skipped(),
            capacity,
            "input loaded"
        );

        self.enter(Stage::Draining);
        let pool = WorkerPool::new(self.config.workers)?.with_deadline(self.config.drain_deadline);
        let pool_report = pool.run(&buffer, &collector, self.predicate.as_ref(), &self.stop)?;
        if pool_report.stopped_early {
            tracing::warn!(
                remaining = buffer.len(),
                "draining stopped before the buffer was empty"
            );
        }

        self.enter(Stage::Finalizing);
        let buffer_stats = buffer.stats();
        buffer.shutdown()?;
        collector.seal()?;
        let records = collector.finalize();
        let encoder = RecordEncoder::new(self.config.skip_policy);
        let written = emit(&records, &encoder).map_err(|io| PipelineError::EncodeIo {
            sink_name: sink_name.to_string(),
            io,
        })?;
        tracing::info!(
            sink = sink_name,
            matched = records.len(),
            written,
            "results written"
        );

        self.enter(Stage::Done);
        Ok(PipelineReport {
            loaded,
            capacity,
            matched: records.len(),
            written,
            workers: pool.size(),
            predicate: self.predicate.name().to_string(),
            stopped_early: pool_report.stopped_early,
            buffer: buffer_stats,
            pool: pool_report,
        })
    }

    fn enter(&mut self, stage: Stage) {
        tracing::info!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }
}
