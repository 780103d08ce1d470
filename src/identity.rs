//! Identity and ownership lookup
//!
//! Authentication lives in a collaborating module: this crate only needs to
//! turn a session token into a user id and compare that id against a quiz's
//! owner. The [`Identity`] trait is the seam the collaborator implements;
//! the engine passes it into every administrator-facing operation.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

/// A unique identifier for an administrator account
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    /// Creates a new random user ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    /// Parses a user ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Errors that can occur when resolving a token
#[derive(Error, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The token is empty or does not refer to a logged-in user
    #[error("token is empty or does not refer to a logged-in user")]
    InvalidToken,
}

/// Resolves session tokens to users
///
/// Implemented by the collaborating auth module. Implementations must fail
/// with [`Error::InvalidToken`] for empty tokens and for tokens that do not
/// belong to a live login session.
pub trait Identity {
    /// Resolves a session token to the user it belongs to
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] if the token is empty or unknown.
    fn resolve_token(&self, token: &str) -> Result<UserId, Error>;
}
