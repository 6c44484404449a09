//! Persistence layer abstractions.
//!
//! This module describes the wire format of a persisted event
//! ([`StoredEvent`]), the storage contract ([`EventStore`]), and a reference
//! in-memory implementation.
use std::{fmt, future::Future};

use chrono::{DateTime, Utc};
pub use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{concurrency::ConcurrencyConflict, event::Version};

pub mod inmemory;

/// Event as persisted and transported.
///
/// Serializes to
/// `{ "aggregateId", "version", "occurredAt", "eventName", "payload" }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent<Id> {
    pub aggregate_id: Id,
    pub version: Version,
    pub occurred_at: DateTime<Utc>,
    pub event_name: String,
    pub payload: serde_json::Value,
}

/// Error from append operations.
#[derive(Debug, Error)]
pub enum AppendError<StoreError>
where
    StoreError: std::error::Error,
{
    /// Another writer modified the stream since it was loaded.
    #[error(transparent)]
    Conflict(#[from] ConcurrencyConflict),
    /// The batch is not numbered contiguously after the expected version.
    #[error("event batch starts at version {found}, expected {expected}")]
    VersionMismatch { expected: Version, found: Version },
    /// Underlying store error.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

/// Convenience alias for append outcomes returned by event stores.
///
/// On success, carries the version of the last event written.
pub type AppendOutcome<Err> = Result<Version, AppendError<Err>>;

/// Abstraction over the persistence layer for event streams.
///
/// A stream is addressed by aggregate kind and aggregate id. Appends carry
/// the version the writer expects the stream to be at so the store can
/// reject stale writes.
pub trait EventStore: Send + Sync {
    /// Aggregate identifier type.
    type Id: Clone + fmt::Debug + Send + Sync + 'static;

    /// Store-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get the current version of an aggregate stream.
    ///
    /// Returns `None` for streams with no events.
    ///
    /// # Errors
    ///
    /// Returns a store-specific error when the operation fails.
    fn stream_version<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a Self::Id,
    ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + 'a;

    /// Load every event of a stream, ordered by version.
    ///
    /// # Errors
    ///
    /// Returns a store-specific error when loading fails.
    fn load<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a Self::Id,
    ) -> impl Future<Output = Result<Vec<StoredEvent<Self::Id>>, Self::Error>> + Send + 'a;

    /// Append events, checking the stream is still at `expected_version`.
    ///
    /// `None` means the writer expects a new, empty stream.
    ///
    /// # Errors
    ///
    /// Returns [`AppendError::Conflict`] if the stream version doesn't
    /// match, [`AppendError::VersionMismatch`] if the batch does not continue
    /// from `expected_version`, or [`AppendError::Store`] if persistence
    /// fails.
    fn append<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a Self::Id,
        expected_version: Option<Version>,
        events: NonEmpty<StoredEvent<Self::Id>>,
    ) -> impl Future<Output = AppendOutcome<Self::Error>> + Send + 'a;
}

/// Check that `events` continue the stream from `expected_version` without
/// gaps. Shared by store implementations.
///
/// # Errors
///
/// Returns [`AppendError::VersionMismatch`] at the first misnumbered event.
pub fn check_batch_versions<Id, E>(
    expected_version: Option<Version>,
    events: &NonEmpty<StoredEvent<Id>>,
) -> Result<Version, AppendError<E>>
where
    E: std::error::Error,
{
    let mut expected = Version::after(expected_version);
    for event in events.iter() {
        if event.version != expected {
            return Err(AppendError::VersionMismatch {
                expected,
                found: event.version,
            });
        }
        expected = expected.next();
    }
    Ok(events.last().version)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct StreamKey<Id> {
    aggregate_kind: String,
    aggregate_id: Id,
}

impl<Id> StreamKey<Id> {
    pub(crate) fn new(aggregate_kind: impl Into<String>, aggregate_id: Id) -> Self {
        Self {
            aggregate_kind: aggregate_kind.into(),
            aggregate_id,
        }
    }
}
