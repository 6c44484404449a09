//! Translation between aggregates and persisted event streams.
//!
//! [`AggregateTranslator`] is the seam an event store talks to: it rebuilds
//! an [`AggregateRoot`] from a stream of [`StoredEvent`]s and turns pending
//! events back into stored ones. Any store that can produce and accept
//! `StoredEvent`s works with it.

use std::fmt;

use thiserror::Error;

use crate::{
    aggregate::{Aggregate, AggregateRoot, ReplayError},
    event::{EventDecodeError, EventSet, Recorded},
    store::StoredEvent,
};

/// Error returned when a persisted stream cannot be turned into an aggregate.
#[derive(Debug, Error)]
pub enum ReconstituteError<Id: fmt::Debug> {
    /// The stream holds an event kind the aggregate has no handler for.
    #[error("unhandled event kind `{kind}` at version {version}, expected one of {expected:?}")]
    UnhandledEventKind {
        kind: String,
        version: u64,
        expected: &'static [&'static str],
    },
    /// A payload does not match the shape of its event kind.
    #[error("failed to decode event at version {version}: {source}")]
    Decode {
        version: u64,
        #[source]
        source: EventDecodeError,
    },
    #[error(transparent)]
    Replay(#[from] ReplayError<Id>),
}

/// Stateless bridge between aggregates and stored event streams.
#[derive(Clone, Copy, Debug, Default)]
pub struct AggregateTranslator;

impl AggregateTranslator {
    /// Decode a persisted stream and replay it into a new aggregate.
    ///
    /// Every event is decoded before any is applied, so a stream with an
    /// unknown kind anywhere fails without building a partial aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstituteError::UnhandledEventKind`] for event kinds the
    /// aggregate does not declare, [`ReconstituteError::Decode`] for
    /// malformed payloads, and [`ReconstituteError::Replay`] for empty or
    /// non-contiguous streams.
    pub fn reconstitute_aggregate_from_history<A, I>(
        self,
        stream: I,
    ) -> Result<AggregateRoot<A>, ReconstituteError<A::Id>>
    where
        A: Aggregate,
        I: IntoIterator<Item = StoredEvent<A::Id>>,
    {
        let events = stream
            .into_iter()
            .map(decode::<A>)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            aggregate_kind = A::KIND,
            event_count = events.len(),
            "decoded stream for reconstitution"
        );
        Ok(AggregateRoot::reconstitute_from_history(events)?)
    }

    /// Drain the aggregate's pending events into their stored form.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a payload cannot be encoded. The
    /// pending events are consumed either way.
    pub fn extract_pending_stream_events<A>(
        self,
        root: &mut AggregateRoot<A>,
    ) -> Result<Vec<StoredEvent<A::Id>>, serde_json::Error>
    where
        A: Aggregate,
    {
        let pending = root.extract_pending_events();
        tracing::trace!(
            aggregate_kind = A::KIND,
            event_count = pending.len(),
            "extracting pending events"
        );
        pending.into_iter().map(encode::<A>).collect()
    }
}

fn decode<A: Aggregate>(
    stored: StoredEvent<A::Id>,
) -> Result<Recorded<A::Id, A::Event>, ReconstituteError<A::Id>> {
    let version = stored.version;
    let payload = <A::Event as EventSet>::decode(&stored.event_name, stored.payload)
        .map_err(|source| match source {
            EventDecodeError::UnknownKind { kind, expected } => {
                ReconstituteError::UnhandledEventKind {
                    kind,
                    version: version.get(),
                    expected,
                }
            }
            source @ EventDecodeError::Payload { .. } => ReconstituteError::Decode {
                version: version.get(),
                source,
            },
        })?;
    Ok(Recorded::restore(
        stored.aggregate_id,
        version,
        stored.occurred_at,
        payload,
    ))
}

fn encode<A: Aggregate>(
    event: Recorded<A::Id, A::Event>,
) -> Result<StoredEvent<A::Id>, serde_json::Error> {
    let payload = event.payload().encode()?;
    Ok(StoredEvent {
        event_name: event.kind().to_string(),
        version: event.version(),
        occurred_at: event.occurred_at(),
        aggregate_id: event.aggregate_id().clone(),
        payload,
    })
}
