//! In-memory event store implementation for testing.
//!
//! This module provides [`Store`], a thread-safe in-memory implementation of
//! [`EventStore`](super::EventStore) suitable for unit tests and examples.
//!
//! # Example
//!
//! ```
//! use turnstile_core::store::inmemory;
//!
//! let store: inmemory::Store<String> = inmemory::Store::new();
//! ```

use std::{
    collections::HashMap,
    convert::Infallible,
    fmt,
    future::Future,
    sync::{Arc, RwLock},
};

use nonempty::NonEmpty;

use crate::{
    concurrency::ConcurrencyConflict,
    event::Version,
    store::{AppendOutcome, EventStore, StoredEvent, StreamKey, check_batch_versions},
};

/// In-memory event store that keeps streams in a hash map.
///
/// Each stream is a vector of [`StoredEvent`]s in version order. Cloning the
/// store is cheap and clones share the same streams.
#[derive(Clone, Debug)]
pub struct Store<Id> {
    inner: Arc<RwLock<HashMap<StreamKey<Id>, Vec<StoredEvent<Id>>>>>,
}

impl<Id> Store<Id> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<Id> Default for Store<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id> EventStore for Store<Id>
where
    Id: Clone + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static,
{
    type Error = Infallible;
    type Id = Id;

    #[tracing::instrument(skip(self, aggregate_id))]
    fn stream_version<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a Self::Id,
    ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + 'a {
        let stream_key = StreamKey::new(aggregate_kind, aggregate_id.clone());
        let version = {
            let inner = self.inner.read().expect("in-memory store lock poisoned");
            inner
                .get(&stream_key)
                .and_then(|s| s.last().map(|e| e.version))
        };
        tracing::trace!(?version, "retrieved stream version");
        std::future::ready(Ok(version))
    }

    #[tracing::instrument(skip(self, aggregate_id))]
    fn load<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a Self::Id,
    ) -> impl Future<Output = Result<Vec<StoredEvent<Self::Id>>, Self::Error>> + Send + 'a {
        let stream_key = StreamKey::new(aggregate_kind, aggregate_id.clone());
        let events = {
            let inner = self.inner.read().expect("in-memory store lock poisoned");
            inner.get(&stream_key).cloned().unwrap_or_default()
        };
        tracing::debug!(events_loaded = events.len(), "loaded events from store");
        std::future::ready(Ok(events))
    }

    #[tracing::instrument(skip(self, aggregate_id, events), fields(event_count = events.len()))]
    fn append<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a Self::Id,
        expected_version: Option<Version>,
        events: NonEmpty<StoredEvent<Self::Id>>,
    ) -> impl Future<Output = AppendOutcome<Self::Error>> + Send + 'a {
        let result = (|| -> AppendOutcome<Infallible> {
            let last_version = check_batch_versions::<_, Infallible>(expected_version, &events)?;

            let mut inner = self.inner.write().expect("in-memory store lock poisoned");
            let stream = inner
                .entry(StreamKey::new(aggregate_kind, aggregate_id.clone()))
                .or_default();

            let current = stream.last().map(|e| e.version);
            if current != expected_version {
                tracing::debug!(?expected_version, ?current, "version mismatch, rejecting append");
                return Err(ConcurrencyConflict {
                    expected: expected_version,
                    actual: current,
                }
                .into());
            }

            stream.extend(events);
            drop(inner);
            tracing::debug!(%last_version, "events appended to stream");
            Ok(last_version)
        })();

        std::future::ready(result)
    }
}
