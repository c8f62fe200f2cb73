//! Filter predicates applied by the worker pool.
//!
//! The pool only sees the `Predicate` trait, so replacing the default
//! parity test is a matter of passing a different implementation to the
//! pipeline.

use crate::Record;

/// A test deciding whether a record is forwarded to the collector.
pub trait Predicate: Send + Sync {
    /// True when the record should be kept.
    fn matches(&self, record: &Record) -> bool;

    /// The display name of this predicate.
    fn name(&self) -> &str;
}

/// Keeps records whose `number` is even (including negatives and zero).
#[derive(Debug, Clone, Copy, Default)]
pub struct EvenNumber;

impl Predicate for EvenNumber {
    fn matches(&self, record: &Record) -> bool {
        record.number() % 2 == 0
    }

    fn name(&self) -> &str {
        "EVEN"
    }
}

/// Keeps records whose `number` is odd.
#[derive(Debug, Clone, Copy, Default)]
pub struct OddNumber;

impl Predicate for OddNumber {
    fn matches(&self, record: &Record) -> bool {
        record.number() % 2 != 0
    }

    fn name(&self) -> &str {
        "ODD"
    }
}

/// Adapts a closure into a named predicate.
pub struct FnPredicate<F> {
    name: String,
    f: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    fn matches(&self, record: &Record) -> bool {
        (self.f)(record)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
