//! Single-threaded reference executor.
//!
//! This crate filters and sorts records in one pass on the calling thread,
//! with no buffer, pool or collector. It produces the same table as the
//! concurrent `filter-pipeline` driver and serves as its oracle in tests.

pub mod executor;

pub use executor::{execute_serial, run_serial};
