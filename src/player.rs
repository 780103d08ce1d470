//! Player registry for a session
//!
//! This module tracks the players joined to one session: their unique IDs,
//! their names (delegated to [`crate::names::Names`] for uniqueness), and
//! the order in which they joined. Join order matters because it breaks
//! ties in the final ranking.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

use crate::names::{self, Names};

/// A unique identifier for a player
///
/// Each player gets a unique ID when joining a session and keeps it for
/// the life of the session.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random player ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    /// Creates a new random player ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses a player ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The players joined to one session, in join order
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Players {
    /// Name assignments and uniqueness checks
    names: Names,
    /// Player IDs in the order they joined
    order: Vec<Id>,
}

impl Players {
    /// Registers a new player
    ///
    /// An empty `requested` name triggers a generated fallback name;
    /// otherwise the name must be unique within the session.
    ///
    /// # Arguments
    ///
    /// * `requested` - The name the player asked for, possibly empty
    ///
    /// # Returns
    ///
    /// The new player's ID and their assigned name
    ///
    /// # Errors
    ///
    /// Returns a [`names::Error`] if the requested name is taken or too
    /// long.
    pub fn join(&mut self, requested: &str) -> Result<(Id, String), names::Error> {
        let id = Id::new();
        let name = if requested.is_empty() {
            self.names.assign_generated(id)?
        } else {
            self.names.set_name(id, requested)?
        };
        self.order.push(id);
        Ok((id, name))
    }

    /// Returns the number of joined players
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Checks whether no player has joined yet
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Checks whether a player belongs to this session
    pub fn contains(&self, id: Id) -> bool {
        self.names.get_name(&id).is_some()
    }

    /// Gets the name of a player
    pub fn name(&self, id: Id) -> Option<String> {
        self.names.get_name(&id)
    }

    /// Gets a player's position in the join order (0-based)
    pub fn join_position(&self, id: Id) -> Option<usize> {
        self.order.iter().position(|other| *other == id)
    }

    /// Returns the player IDs in join order
    pub fn ids(&self) -> &[Id] {
        &self.order
    }

    /// Returns the player names in join order
    pub fn names_in_join_order(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|id| self.names.get_name(id))
            .collect()
    }
}
