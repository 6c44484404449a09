use super::{events::BuildingId, policy::AccessPolicy};

/// Register a new building under a caller-chosen id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterBuilding {
    pub id: BuildingId,
    pub name: String,
}

impl RegisterBuilding {
    pub fn new(id: BuildingId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Let a user into the building, subject to `policy`.
#[derive(Clone, Copy, Debug)]
pub struct CheckInUser<'a> {
    pub username: &'a str,
    pub policy: &'a dyn AccessPolicy,
}

impl<'a> CheckInUser<'a> {
    pub const fn new(username: &'a str, policy: &'a dyn AccessPolicy) -> Self {
        Self { username, policy }
    }
}

/// Let a user out of the building, subject to `policy`.
#[derive(Clone, Copy, Debug)]
pub struct CheckOutUser<'a> {
    pub username: &'a str,
    pub policy: &'a dyn AccessPolicy,
}

impl<'a> CheckOutUser<'a> {
    pub const fn new(username: &'a str, policy: &'a dyn AccessPolicy) -> Self {
        Self { username, policy }
    }
}
