//! # filter-pipeline
//!
//! A concurrent record filter pipeline.
//!
//! Records are loaded into a bounded buffer, pulled one at a time by a pool
//! of parallel workers, tested against a predicate, and the matches are
//! collected, sorted by `number` and written out as a text table.
//!
//! ## Overview
//!
//! - **Record**: an immutable `(label, number, value)` triple
//! - **BoundedBuffer**: FIFO of pending records with advisory full/empty
//!   notifications around a capacity threshold
//! - **WorkerPool**: workers pulling from the buffer until it runs dry
//! - **ResultCollector**: concurrent accumulator sorted once, after the
//!   terminal signal
//! - **Pipeline**: the driver sequencing load, drain and finalize
//!
//! ## Example
//!
//! ```
//! use filter_pipeline::{InputSource, OutputSink, Pipeline, PipelineConfig};
//! use std::io::Cursor;
//!
//! let config = PipelineConfig::new(InputSource::Stdin, OutputSink::Stdout);
//! let mut pipeline = Pipeline::new(config).unwrap();
//!
//! let mut out = Vec::new();
//! let report = pipeline
//!     .run_with(Cursor::new("a;4;1.5\nb;7;2.0\nc;2;3.25\n"), &mut out)
//!     .unwrap();
//!
//! assert_eq!(report.matched, 2);
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "| Text | Number | Value |\n| c | 2 | 3.25 |\n| a | 4 | 1.50 |\n"
//! );
//! ```

pub mod buffer;
pub mod codec;
pub mod collector;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod predicate;
pub mod record;

pub use buffer::{BoundedBuffer, BufferSignal, BufferStats};
pub use codec::{HEADER, RecordDecoder, RecordEncoder, SkipPolicy, parse_line};
pub use collector::ResultCollector;
pub use error::{BufferError, CollectorError, PipelineError, Result};
pub use pipeline::{InputSource, OutputSink, Pipeline, PipelineConfig, PipelineReport, Stage};
pub use pool::{PoolReport, StopHandle, WorkerPool, WorkerStats};
pub use predicate::{EvenNumber, FnPredicate, OddNumber, Predicate};
pub use record::Record;
