use thiserror::Error;

use super::policy::PolicyError;

/// Reasons a building rejects a command.
///
/// A rejected command records nothing.
#[derive(Debug, Error)]
pub enum BuildingError {
    #[error("building is already registered")]
    AlreadyRegistered,
    #[error("building is not registered")]
    NotRegistered,
    #[error("building name must not be empty")]
    EmptyName,
    #[error("user `{username}` is not allowed to pass")]
    AccessDenied { username: String },
    #[error(transparent)]
    Policy(#[from] PolicyError),
}
