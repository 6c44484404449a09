//! Optimistic concurrency at the persistence boundary.
//!
//! Aggregates tag every recorded event with the next version of their
//! stream. A store compares the version an aggregate was loaded at with the
//! stream's current version and rejects the append with a
//! [`ConcurrencyConflict`] when another writer got there first.

use thiserror::Error;

use crate::event::Version;

/// Error indicating a concurrency conflict during append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{}", format_conflict(*.expected, *.actual))]
pub struct ConcurrencyConflict {
    /// The version we expected (from when we loaded the aggregate).
    /// `None` indicates we expected a new/empty stream.
    pub expected: Option<Version>,
    /// The actual current version in the store.
    /// `None` indicates the stream is empty.
    pub actual: Option<Version>,
}

/// Build a human-readable message for a [`ConcurrencyConflict`], including an
/// actionable hint for the caller.
fn format_conflict(expected: Option<Version>, actual: Option<Version>) -> String {
    match (expected, actual) {
        (None, Some(actual)) => {
            format!(
                "concurrency conflict: expected new stream, found version {actual} (hint: \
                 another process registered this aggregate; reload and retry)"
            )
        }
        (Some(expected), Some(actual)) => {
            format!(
                "concurrency conflict: expected version {expected}, found {actual} (hint: \
                 stream was modified; reload and retry)"
            )
        }
        (Some(expected), None) => {
            format!("concurrency conflict: expected version {expected}, but the stream is empty")
        }
        (None, None) => "concurrency conflict: unexpected empty state".to_string(),
    }
}
