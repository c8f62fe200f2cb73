//! Serial filter-then-sort executor.
//!
//! Decodes every record, keeps those matching the predicate in input order,
//! and stable-sorts them by `number`. Because input order is fixed, ties
//! come out in a deterministic order here, whereas the concurrent pipeline
//! orders ties by worker arrival.

use filter_pipeline::{PipelineError, Predicate, Record, RecordDecoder, RecordEncoder, SkipPolicy};
use std::io::{BufRead, Write};

/// Filter `records` with `predicate` and stable-sort the matches by number.
pub fn execute_serial<I>(records: I, predicate: &dyn Predicate) -> Vec<Record>
where
    I: IntoIterator<Item = Record>,
{
    let mut kept: Vec<Record> = records
        .into_iter()
        .filter(|r| predicate.matches(r))
        .collect();
    kept.sort_by_key(Record::number);
    kept
}

/// Decode `input`, filter, sort and encode to `output`.
///
/// Returns (input_count, output_count) on success.
pub fn run_serial<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    predicate: &dyn Predicate,
    delimiter: char,
    policy: SkipPolicy,
) -> Result<(usize, usize), PipelineError> {
    let records = RecordDecoder::with_delimiter(input, delimiter)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|io| PipelineError::DecodeIo {
            source_name: "(reader)".to_string(),
            io,
        })?;
    let input_count = records.len();

    let kept = execute_serial(records, predicate);
    tracing::debug!(input_count, matched = kept.len(), "serial filter done");

    let output_count = RecordEncoder::new(policy)
        .encode(&kept, output)
        .map_err(|io| PipelineError::EncodeIo {
            sink_name: "(writer)".to_string(),
            io,
        })?;
    Ok((input_count, output_count))
}
