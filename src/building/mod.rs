//! The building access-control domain.
//!
//! A [`Building`] tracks which users are inside. Checking in twice, or
//! checking out while outside, is not an error: it records a
//! [`CheckInAnomalyDetected`] event so the anomaly stays in the audit trail.

mod aggregate;
mod commands;
mod error;
mod events;
pub mod policy;

pub use aggregate::Building;
pub use commands::{CheckInUser, CheckOutUser, RegisterBuilding};
pub use error::BuildingError;
pub use events::{
    AnomalyReason, BuildingEvent, BuildingId, CheckInAnomalyDetected, NewBuildingWasRegistered,
    UserCheckedIn, UserCheckedOut,
};
pub use policy::{AccessPolicy, AllowList, AlwaysAllow, DenyList, PolicyError};
