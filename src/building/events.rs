use std::fmt;

use serde::{Deserialize, Serialize};
use turnstile_core::event::{DomainEvent, EventDecodeError, EventKind, EventSet, decode_payload};
use uuid::Uuid;

/// Identity of a building's event stream.
///
/// Ids are minted by the caller; the aggregate never generates one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(Uuid);

impl BuildingId {
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// A fresh random (v4) id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for BuildingId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A building was registered. Recorded once, as the first event of its
/// stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBuildingWasRegistered {
    pub name: String,
}

impl NewBuildingWasRegistered {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DomainEvent for NewBuildingWasRegistered {
    const KIND: &'static str = "NewBuildingWasRegistered";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCheckedIn {
    pub username: String,
}

impl UserCheckedIn {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl DomainEvent for UserCheckedIn {
    const KIND: &'static str = "UserCheckedIn";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCheckedOut {
    pub username: String,
}

impl UserCheckedOut {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl DomainEvent for UserCheckedOut {
    const KIND: &'static str = "UserCheckedOut";
}

/// Why a check-in or check-out was anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyReason {
    /// The user checked in while already checked in.
    AlreadyCheckedIn,
    /// The user checked out while not checked in.
    AlreadyCheckedOut,
}

/// A check-in or check-out that contradicted the building's state.
///
/// Recorded in place of the expected event; it never changes who is checked
/// in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInAnomalyDetected {
    pub username: String,
    pub reason: AnomalyReason,
}

impl CheckInAnomalyDetected {
    pub fn new(username: impl Into<String>, reason: AnomalyReason) -> Self {
        Self {
            username: username.into(),
            reason,
        }
    }
}

impl DomainEvent for CheckInAnomalyDetected {
    const KIND: &'static str = "CheckInAnomalyDetected";
}

/// Every event a building's stream can contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildingEvent {
    Registered(NewBuildingWasRegistered),
    CheckedIn(UserCheckedIn),
    CheckedOut(UserCheckedOut),
    AnomalyDetected(CheckInAnomalyDetected),
}

impl From<NewBuildingWasRegistered> for BuildingEvent {
    fn from(e: NewBuildingWasRegistered) -> Self {
        Self::Registered(e)
    }
}

impl From<UserCheckedIn> for BuildingEvent {
    fn from(e: UserCheckedIn) -> Self {
        Self::CheckedIn(e)
    }
}

impl From<UserCheckedOut> for BuildingEvent {
    fn from(e: UserCheckedOut) -> Self {
        Self::CheckedOut(e)
    }
}

impl From<CheckInAnomalyDetected> for BuildingEvent {
    fn from(e: CheckInAnomalyDetected) -> Self {
        Self::AnomalyDetected(e)
    }
}

impl EventKind for BuildingEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Registered(e) => e.kind(),
            Self::CheckedIn(e) => e.kind(),
            Self::CheckedOut(e) => e.kind(),
            Self::AnomalyDetected(e) => e.kind(),
        }
    }
}

impl EventSet for BuildingEvent {
    const EVENT_KINDS: &'static [&'static str] = &[
        NewBuildingWasRegistered::KIND,
        UserCheckedIn::KIND,
        UserCheckedOut::KIND,
        CheckInAnomalyDetected::KIND,
    ];

    fn encode(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Registered(e) => serde_json::to_value(e),
            Self::CheckedIn(e) => serde_json::to_value(e),
            Self::CheckedOut(e) => serde_json::to_value(e),
            Self::AnomalyDetected(e) => serde_json::to_value(e),
        }
    }

    fn decode(kind: &str, payload: serde_json::Value) -> Result<Self, EventDecodeError> {
        match kind {
            NewBuildingWasRegistered::KIND => decode_payload(payload).map(Self::Registered),
            UserCheckedIn::KIND => decode_payload(payload).map(Self::CheckedIn),
            UserCheckedOut::KIND => decode_payload(payload).map(Self::CheckedOut),
            CheckInAnomalyDetected::KIND => decode_payload(payload).map(Self::AnomalyDetected),
            _ => Err(EventDecodeError::UnknownKind {
                kind: kind.to_string(),
                expected: Self::EVENT_KINDS,
            }),
        }
    }
}
