//! Access policies consulted before a user may pass the turnstile.
//!
//! A policy answers a single question: may this user pass? It is handed to
//! the check-in and check-out commands by the caller, so the aggregate never
//! owns or stores one.

use std::{collections::HashSet, error::Error as StdError, fmt};

use thiserror::Error;

/// Failure to reach an access decision.
///
/// A policy error is never treated as "allowed"; the command fails and
/// nothing is recorded.
#[derive(Debug, Error)]
#[error("access policy failed: {source}")]
pub struct PolicyError {
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl PolicyError {
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Decides whether a user may enter or leave a building.
pub trait AccessPolicy {
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the decision cannot be made.
    fn is_allowed(&self, username: &str) -> Result<bool, PolicyError>;
}

impl<F> AccessPolicy for F
where
    F: Fn(&str) -> bool,
{
    fn is_allowed(&self, username: &str) -> Result<bool, PolicyError> {
        Ok(self(username))
    }
}

/// Lets everyone through.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysAllow;

impl AccessPolicy for AlwaysAllow {
    fn is_allowed(&self, _username: &str) -> Result<bool, PolicyError> {
        Ok(true)
    }
}

/// Lets only the listed users through.
#[derive(Clone, Debug, Default)]
pub struct AllowList {
    users: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: users.into_iter().map(Into::into).collect(),
        }
    }
}

impl AccessPolicy for AllowList {
    fn is_allowed(&self, username: &str) -> Result<bool, PolicyError> {
        Ok(self.users.contains(username))
    }
}

/// Lets everyone through except the listed users.
#[derive(Clone, Debug, Default)]
pub struct DenyList {
    users: HashSet<String>,
}

impl DenyList {
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            users: users.into_iter().map(Into::into).collect(),
        }
    }
}

impl AccessPolicy for DenyList {
    fn is_allowed(&self, username: &str) -> Result<bool, PolicyError> {
        Ok(!self.users.contains(username))
    }
}

impl fmt::Debug for dyn AccessPolicy + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn AccessPolicy")
    }
}
