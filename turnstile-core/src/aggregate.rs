//! Command-side domain primitives.
//!
//! This module defines the building blocks for aggregates: state
//! reconstruction (`Aggregate::apply`), command handling (`Handle`), and the
//! generic [`AggregateRoot`] that replays history, records new events and
//! hands pending events over to persistence.

use std::fmt;

use thiserror::Error;

use crate::event::{Change, EventSet, Recorded, Version};

/// Command-side entities that produce domain events.
///
/// Aggregates rebuild their state from events and validate commands via
/// [`Handle<C>`]. `apply` is the aggregate's complete handler table: an
/// exhaustive `match` over its closed event enum.
pub trait Aggregate: Default + Sized {
    /// Aggregate type identifier used to name event streams.
    ///
    /// Use a stable, lowercase name: `"building"`, `"user-account"`, etc.
    const KIND: &'static str;

    type Id: Clone + PartialEq + fmt::Debug;
    type Event: EventSet + Clone;
    type Error;

    /// Apply an event to update aggregate state.
    ///
    /// Called both when replaying history and when recording a freshly
    /// handled command, so the two paths always yield identical state.
    fn apply(&mut self, event: &Recorded<Self::Id, Self::Event>);

    /// Whether `event` may be the first event of a stream.
    ///
    /// Replay rejects histories that start with any other event. Aggregates
    /// born from a dedicated creation event override this.
    fn opens_stream(event: &Self::Event) -> bool {
        let _ = event;
        true
    }
}

/// Entry point for command handling.
///
/// Each command type gets its own implementation. Handlers inspect state and
/// decide which changes occur; they never mutate the aggregate themselves.
///
/// ```ignore
/// impl Handle<Deposit> for Account {
///     fn handle(&self, command: &Deposit) -> Result<Vec<Change<..>>, Self::Error> {
///         if command.amount <= 0 {
///             return Err(AccountError::NonPositiveAmount);
///         }
///         Ok(vec![Change::occur(self.id, FundsDeposited { amount: command.amount })])
///     }
/// }
/// ```
pub trait Handle<C>: Aggregate {
    /// Handle a command and produce changes.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the command is invalid for the current
    /// aggregate state.
    fn handle(&self, command: &C) -> Result<Vec<Change<Self::Id, Self::Event>>, Self::Error>;
}

/// Error raised when a history cannot be replayed into an aggregate.
///
/// Every variant indicates a corrupted, truncated or incompatible stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError<Id: fmt::Debug> {
    #[error("cannot reconstitute an aggregate from an empty history")]
    EmptyHistory,
    #[error("event stream starts with `{kind}`, which cannot open a stream")]
    MissingStreamStart { kind: &'static str },
    #[error("event stream is not contiguous: expected version {expected}, found {found}")]
    VersionGap { expected: Version, found: Version },
    #[error("event at version {version} belongs to aggregate {found:?}, not {expected:?}")]
    ForeignEvent {
        expected: Id,
        found: Id,
        version: Version,
    },
}

/// Generic aggregate container.
///
/// Holds the aggregate state together with its stream version, the ordered
/// history of every event applied so far, and the events recorded since the
/// last call to [`extract_pending_events`](Self::extract_pending_events).
pub struct AggregateRoot<A: Aggregate> {
    state: A,
    version: Option<Version>,
    history: Vec<Recorded<A::Id, A::Event>>,
    pending: Vec<Recorded<A::Id, A::Event>>,
}

impl<A: Aggregate> AggregateRoot<A> {
    /// A fresh aggregate with no history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: A::default(),
            version: None,
            history: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Rebuild an aggregate by replaying its stream in order.
    ///
    /// Replayed events are part of the history but never pending.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::EmptyHistory`] for an empty stream,
    /// [`ReplayError::MissingStreamStart`] if the first event cannot open a
    /// stream, [`ReplayError::VersionGap`] unless versions run `1, 2, 3, ...`,
    /// and [`ReplayError::ForeignEvent`] if the stream mixes aggregate ids.
    pub fn reconstitute_from_history<I>(events: I) -> Result<Self, ReplayError<A::Id>>
    where
        I: IntoIterator<Item = Recorded<A::Id, A::Event>>,
    {
        let mut root = Self::new();
        let mut stream_id: Option<A::Id> = None;

        for event in events {
            let expected = Version::after(root.version);
            if event.version() != expected {
                return Err(ReplayError::VersionGap {
                    expected,
                    found: event.version(),
                });
            }
            match &stream_id {
                Some(id) if id != event.aggregate_id() => {
                    return Err(ReplayError::ForeignEvent {
                        expected: id.clone(),
                        found: event.aggregate_id().clone(),
                        version: event.version(),
                    });
                }
                Some(_) => {}
                None => {
                    if !A::opens_stream(event.payload()) {
                        return Err(ReplayError::MissingStreamStart { kind: event.kind() });
                    }
                    stream_id = Some(event.aggregate_id().clone());
                }
            }
            root.apply_recorded(event);
        }

        if root.version.is_none() {
            return Err(ReplayError::EmptyHistory);
        }
        tracing::trace!(
            aggregate_kind = A::KIND,
            version = ?root.version,
            "aggregate reconstituted from history"
        );
        Ok(root)
    }

    /// Execute a command against the aggregate.
    ///
    /// On success every change the handler produced has been recorded; on
    /// error nothing has.
    ///
    /// # Errors
    ///
    /// Returns the handler's error when it rejects the command.
    pub fn execute<C>(&mut self, command: &C) -> Result<(), A::Error>
    where
        A: Handle<C>,
    {
        let changes = self.state.handle(command)?;
        for change in changes {
            self.record_that(change);
        }
        Ok(())
    }

    fn record_that(&mut self, change: Change<A::Id, A::Event>) {
        let event = change.recorded_as(Version::after(self.version));
        tracing::trace!(
            aggregate_kind = A::KIND,
            event_kind = event.kind(),
            version = %event.version(),
            "event recorded"
        );
        self.pending.push(event.clone());
        self.apply_recorded(event);
    }

    fn apply_recorded(&mut self, event: Recorded<A::Id, A::Event>) {
        self.state.apply(&event);
        self.version = Some(event.version());
        self.history.push(event);
    }

    /// Hand over every event recorded since the last extraction.
    ///
    /// Each event is surfaced exactly once; calling this again without an
    /// intervening command returns an empty vector.
    pub fn extract_pending_events(&mut self) -> Vec<Recorded<A::Id, A::Event>> {
        std::mem::take(&mut self.pending)
    }

    pub const fn state(&self) -> &A {
        &self.state
    }

    /// Version of the last applied event; `None` for a fresh aggregate.
    pub const fn version(&self) -> Option<Version> {
        self.version
    }

    /// Version the stream had before the pending events were recorded.
    ///
    /// This is the expected version for an optimistic append of
    /// [`extract_pending_events`](Self::extract_pending_events).
    pub fn persisted_version(&self) -> Option<Version> {
        self.pending
            .first()
            .map_or(self.version, |first| Version::new(first.version().get() - 1))
    }

    pub fn history(&self) -> &[Recorded<A::Id, A::Event>] {
        &self.history
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }
}

impl<A: Aggregate> Default for AggregateRoot<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for AggregateRoot<A>
where
    A: Aggregate + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateRoot")
            .field("kind", &A::KIND)
            .field("state", &self.state)
            .field("version", &self.version)
            .field("history_len", &self.history.len())
            .field("pending_len", &self.pending.len())
            .finish()
    }
}
