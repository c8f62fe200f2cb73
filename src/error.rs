//! Error types for the filter pipeline.
//!
//! Component errors (`BufferError`, `CollectorError`) signal staging bugs:
//! they only occur when the driver sequences phases incorrectly. I/O errors
//! at the decoder and encoder boundaries abort the run. Malformed input
//! lines are never errors; the decoder skips or zero-defaults them.

use std::io;
use thiserror::Error;

/// Misuse of the bounded buffer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("operation on closed buffer")]
    Closed,

    #[error("buffer capacity already set to {0}")]
    CapacityAlreadySet(usize),

    #[error("buffer capacity set after records were pulled")]
    CapacityAfterPull,
}

/// Misuse of the result collector.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorError {
    #[error("insert into sealed result collector")]
    Sealed,

    #[error("result collector already sealed")]
    AlreadySealed,
}

/// Errors surfaced by a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),

    #[error("Error reading input '{source_name}': {io}")]
    DecodeIo {
        source_name: String,
        #[source]
        io: io::Error,
    },

    #[error("Error writing output '{sink_name}': {io}")]
    EncodeIo {
        sink_name: String,
        #[source]
        io: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("Pipeline has already run")]
    AlreadyRan,
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
