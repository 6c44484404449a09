//! Domain event model.
//!
//! `DomainEvent` is the lightweight trait every concrete payload struct
//! implements. [`Change`] and [`Recorded`] carry a payload together with the
//! aggregate identity, version and timestamp: a `Change` has occurred but has
//! not yet been appended to a stream, a `Recorded` event has.

use std::{fmt, num::NonZeroU64};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when decoding a stored event into an event enum fails.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    /// The event kind was not recognized by this event enum.
    #[error("unknown event kind `{kind}`, expected one of {expected:?}")]
    UnknownKind {
        /// The unrecognized event kind string.
        kind: String,
        /// The list of event kinds this enum can handle.
        expected: &'static [&'static str],
    },
    /// The payload did not match the shape of the named event kind.
    #[error("malformed `{kind}` payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Marker trait for event payloads that can be persisted.
///
/// Each payload carries a unique [`Self::KIND`] identifier. It is written to
/// the stream as the `eventName` and used to route stored payloads back to
/// the correct type when an aggregate is reconstituted.
pub trait DomainEvent {
    const KIND: &'static str;
}

/// Instance-level access to an event's kind.
///
/// Blanket-implemented for every [`DomainEvent`]; event enums implement it
/// with a `match` over their variants.
pub trait EventKind {
    fn kind(&self) -> &'static str;
}

impl<T: DomainEvent> EventKind for T {
    fn kind(&self) -> &'static str {
        T::KIND
    }
}

/// A closed set of event kinds belonging to one aggregate type.
///
/// Implemented by each aggregate's event enum. [`Self::EVENT_KINDS`] lists
/// every kind the aggregate has a handler for; anything else found in a
/// stream is rejected at decode time.
pub trait EventSet: EventKind + Sized {
    const EVENT_KINDS: &'static [&'static str];

    /// Encode the variant's payload to its wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    fn encode(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Decode a payload persisted under `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EventDecodeError::UnknownKind`] if `kind` is not one of
    /// [`Self::EVENT_KINDS`], or [`EventDecodeError::Payload`] if the payload
    /// does not deserialize.
    fn decode(kind: &str, payload: serde_json::Value) -> Result<Self, EventDecodeError>;
}

/// Decode a single payload type, tagging failures with its kind.
///
/// Intended for use inside [`EventSet::decode`] implementations.
///
/// # Errors
///
/// Returns [`EventDecodeError::Payload`] when the payload does not match `E`.
pub fn decode_payload<E>(payload: serde_json::Value) -> Result<E, EventDecodeError>
where
    E: DomainEvent + serde::de::DeserializeOwned,
{
    serde_json::from_value(payload).map_err(|source| EventDecodeError::Payload {
        kind: E::KIND.to_string(),
        source,
    })
}

/// Position of an event within its aggregate's stream.
///
/// Versions start at [`Version::FIRST`] and increase by one for every event
/// appended to the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(NonZeroU64);

impl Version {
    pub const FIRST: Self = Self(NonZeroU64::MIN);

    /// Build a version from a raw stream position. Returns `None` for zero.
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        match NonZeroU64::new(value) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// The version assigned to the event appended after this one.
    ///
    /// # Panics
    ///
    /// Panics if the stream has reached `u64::MAX` events.
    #[must_use]
    pub const fn next(self) -> Self {
        match self.0.checked_add(1) {
            Some(v) => Self(v),
            None => panic!("event stream version overflow"),
        }
    }

    /// The version following `current`, where `None` is an empty stream.
    #[must_use]
    pub const fn after(current: Option<Self>) -> Self {
        match current {
            Some(v) => v.next(),
            None => Self::FIRST,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Something that happened to an aggregate and has not yet been recorded.
///
/// Command handlers return changes. The aggregate root assigns each one the
/// next version of its stream when recording it.
#[derive(Clone, Debug, PartialEq)]
pub struct Change<Id, E> {
    aggregate_id: Id,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<Id, E> Change<Id, E> {
    /// Stamp a payload as having occurred to `aggregate_id` just now.
    pub fn occur(aggregate_id: Id, payload: impl Into<E>) -> Self {
        Self {
            aggregate_id,
            occurred_at: Utc::now(),
            payload: payload.into(),
        }
    }

    pub const fn aggregate_id(&self) -> &Id {
        &self.aggregate_id
    }

    pub const fn payload(&self) -> &E {
        &self.payload
    }

    /// Assign the stream version this change is appended under.
    #[must_use]
    pub fn recorded_as(self, version: Version) -> Recorded<Id, E> {
        Recorded {
            aggregate_id: self.aggregate_id,
            version,
            occurred_at: self.occurred_at,
            payload: self.payload,
        }
    }
}

/// An event that is part of an aggregate's stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Recorded<Id, E> {
    aggregate_id: Id,
    version: Version,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<Id, E> Recorded<Id, E> {
    /// Restore an event read back from storage.
    pub(crate) const fn restore(
        aggregate_id: Id,
        version: Version,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            aggregate_id,
            version,
            occurred_at,
            payload,
        }
    }

    pub const fn aggregate_id(&self) -> &Id {
        &self.aggregate_id
    }

    pub const fn version(&self) -> Version {
        self.version
    }

    pub const fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub const fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl<Id, E: EventKind> Recorded<Id, E> {
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}
