//! Application service orchestration.
//!
//! `Repository` coordinates loading aggregates from an [`EventStore`],
//! invoking command handlers, and appending the resulting events with an
//! optimistic concurrency check.

use std::fmt;

use nonempty::NonEmpty;
use thiserror::Error;

use crate::{
    aggregate::{Aggregate, AggregateRoot, Handle},
    concurrency::ConcurrencyConflict,
    event::Version,
    store::{AppendError, EventStore},
    translator::{AggregateTranslator, ReconstituteError},
};

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError<AggregateError, Id, StoreError>
where
    Id: fmt::Debug,
    StoreError: std::error::Error + 'static,
{
    #[error("aggregate rejected command: {0}")]
    Aggregate(AggregateError),
    #[error(transparent)]
    Concurrency(ConcurrencyConflict),
    #[error("failed to load event stream: {0}")]
    Load(#[source] StoreError),
    #[error("failed to rebuild aggregate state: {0}")]
    Reconstitute(#[source] ReconstituteError<Id>),
    #[error("failed to encode events: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to persist events: {0}")]
    Persist(#[source] AppendError<StoreError>),
}

/// Result type alias for repository operations.
///
/// On success, carries the stream version after the operation; `None` when
/// the stream is still empty.
pub type RepositoryResult<T, A, S> = Result<
    T,
    RepositoryError<<A as Aggregate>::Error, <A as Aggregate>::Id, <S as EventStore>::Error>,
>;

/// Loads aggregates from, and commits their events to, an event store.
#[derive(Clone, Debug)]
pub struct Repository<S> {
    store: S,
    translator: AggregateTranslator,
}

impl<S> Repository<S>
where
    S: EventStore,
{
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
            translator: AggregateTranslator,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Load an aggregate by replaying its stream.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Load`] if the store fails, or
    /// [`RepositoryError::Reconstitute`] if the stream is empty or cannot be
    /// replayed.
    pub async fn load<A>(&self, id: &S::Id) -> RepositoryResult<AggregateRoot<A>, A, S>
    where
        A: Aggregate<Id = S::Id>,
        A::Id: 'static,
    {
        let events = self
            .store
            .load(A::KIND, id)
            .await
            .map_err(RepositoryError::Load)?;
        self.translator
            .reconstitute_aggregate_from_history(events)
            .map_err(RepositoryError::Reconstitute)
    }

    /// Append the aggregate's pending events to its stream.
    ///
    /// The expected stream version is the version the aggregate had before
    /// the pending events were recorded. Pending events are drained even if
    /// the append fails; reload the aggregate before retrying.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Concurrency`] if another writer appended
    /// to the stream first, [`RepositoryError::Encode`] if an event cannot be
    /// serialized, or [`RepositoryError::Persist`] if the store fails.
    pub async fn commit<A>(
        &self,
        root: &mut AggregateRoot<A>,
    ) -> RepositoryResult<Option<Version>, A, S>
    where
        A: Aggregate<Id = S::Id>,
        A::Id: 'static,
    {
        let expected_version = root.persisted_version();
        let events = self
            .translator
            .extract_pending_stream_events(root)
            .map_err(RepositoryError::Encode)?;
        let Some(events) = NonEmpty::from_vec(events) else {
            return Ok(root.version());
        };

        let aggregate_id = events.head.aggregate_id.clone();
        tracing::debug!(
            aggregate_kind = A::KIND,
            event_count = events.len(),
            ?expected_version,
            "committing pending events"
        );
        match self
            .store
            .append(A::KIND, &aggregate_id, expected_version, events)
            .await
        {
            Ok(version) => Ok(Some(version)),
            Err(AppendError::Conflict(conflict)) => Err(RepositoryError::Concurrency(conflict)),
            Err(err) => Err(RepositoryError::Persist(err)),
        }
    }

    /// Load an aggregate, execute a command against it, and commit.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Aggregate`] when the aggregate rejects the
    /// command; other variants as for [`load`](Self::load) and
    /// [`commit`](Self::commit).
    pub async fn execute<A, C>(
        &self,
        id: &S::Id,
        command: &C,
    ) -> RepositoryResult<Option<Version>, A, S>
    where
        A: Aggregate<Id = S::Id> + Handle<C>,
        A::Id: 'static,
    {
        let mut root = self.load::<A>(id).await?;
        root.execute(command).map_err(RepositoryError::Aggregate)?;
        self.commit(&mut root).await
    }

    /// Execute a command against a fresh aggregate and commit it as a new
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Concurrency`] if a stream already exists
    /// for the aggregate id; other variants as for [`execute`](Self::execute).
    pub async fn create<A, C>(&self, command: &C) -> RepositoryResult<Option<Version>, A, S>
    where
        A: Aggregate<Id = S::Id> + Handle<C>,
        A::Id: 'static,
    {
        let mut root = AggregateRoot::<A>::new();
        root.execute(command).map_err(RepositoryError::Aggregate)?;
        self.commit(&mut root).await
    }
}
