//! The record type flowing through the pipeline.
//!
//! A `Record` is an immutable triple of a text label, an integer key and a
//! real value. Records are ordered by `number` alone when the collector
//! sorts them; ties keep their arrival order.

use std::fmt;

/// A single labelled measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    label: String,
    number: i64,
    value: f64,
}

impl Record {
    /// Create a new record.
    pub fn new(label: impl Into<String>, number: i64, value: f64) -> Self {
        Self {
            label: label.into(),
            number,
            value,
        }
    }

    /// The text label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The integer key used for filtering and ordering.
    pub fn number(&self) -> i64 {
        self.number
    }

    /// The real-valued payload.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// True when the label is empty and both numeric fields are zero.
    ///
    /// Such records are what a zero-defaulted decode of a junk line looks
    /// like, and the encoder drops them.
    pub fn is_blank(&self) -> bool {
        self.label.is_empty() && self.number == 0 && self.value == 0.0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.label, self.number, self.value)
    }
}
