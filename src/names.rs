//! Player name management and validation
//!
//! This module handles the assignment and validation of player names within
//! a session. It ensures name uniqueness (case-sensitive exact match),
//! generates fallback names for players who join without one, and maintains
//! bidirectional mappings between player IDs and names.

use std::collections::{HashMap, HashSet, hash_map::Entry};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{constants, player::Id};

/// Serialization helper for Names struct
#[derive(Deserialize)]
struct NamesSerde {
    mapping: HashMap<Id, String>,
}

/// Manages player names and their associations with player IDs
///
/// This struct maintains a bidirectional mapping between player IDs and
/// names, ensuring that names are unique within a session and meet the
/// length requirement.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "NamesSerde")]
pub struct Names {
    /// Primary mapping from player ID to name
    mapping: HashMap<Id, String>,

    /// Reverse mapping from name to player ID (not serialized)
    #[serde(skip_serializing)]
    reverse_mapping: HashMap<String, Id>,
    /// Set of all existing names for quick uniqueness checks (not serialized)
    #[serde(skip_serializing)]
    existing: HashSet<String>,
}

impl From<NamesSerde> for Names {
    /// Reconstructs the Names struct from serialized data
    ///
    /// This rebuilds the reverse mapping and existing names set from
    /// the primary mapping, which is necessary since these fields
    /// are not serialized.
    fn from(serde: NamesSerde) -> Self {
        let NamesSerde { mapping } = serde;
        let mut reverse_mapping = HashMap::new();
        let mut existing = HashSet::new();
        for (id, name) in &mapping {
            reverse_mapping.insert(name.to_owned(), *id);
            existing.insert(name.to_owned());
        }
        Self {
            mapping,
            reverse_mapping,
            existing,
        }
    }
}

/// Errors that can occur during name validation and assignment
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested name is already in use by another player
    #[error("name already in-use")]
    Used,
    /// The player already has an assigned name
    #[error("player has an existing name")]
    Assigned,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
}

/// Generates a fallback player name
///
/// The format is a fixed number of random letters with no repetitions
/// followed by a fixed number of random digits with no repetitions.
fn generate() -> String {
    let mut name = sample_distinct(
        b"abcdefghijklmnopqrstuvwxyz",
        constants::player::GENERATED_NAME_LETTERS,
    );
    name.push_str(&sample_distinct(
        b"0123456789",
        constants::player::GENERATED_NAME_DIGITS,
    ));
    name
}

/// Draws `count` distinct characters from `pool` in random order
fn sample_distinct(pool: &[u8], count: usize) -> String {
    let mut pool = pool.to_vec();
    (0..count)
        .map(|_| pool.swap_remove(fastrand::usize(..pool.len())) as char)
        .collect()
}

impl Names {
    /// Retrieves the name associated with a player ID
    ///
    /// # Arguments
    ///
    /// * `id` - The player ID to look up
    ///
    /// # Returns
    ///
    /// The player's name if they have one assigned, otherwise `None`
    pub fn get_name(&self, id: &Id) -> Option<String> {
        self.mapping.get(id).map(std::borrow::ToOwned::to_owned)
    }

    /// Assigns a name to a player after validation
    ///
    /// Names are compared with a case-sensitive exact match, so "Alice" and
    /// "alice" can coexist within one session.
    ///
    /// # Arguments
    ///
    /// * `id` - The player ID to assign the name to
    /// * `name` - The requested name
    ///
    /// # Returns
    ///
    /// The assigned name on success, or an error describing why the name
    /// was rejected.
    ///
    /// # Errors
    ///
    /// * `Error::TooLong` - Name exceeds the maximum length
    /// * `Error::Used` - Name is already taken by another player
    /// * `Error::Assigned` - Player already has a name assigned
    pub fn set_name(&mut self, id: Id, name: &str) -> Result<String, Error> {
        if name.len() > constants::player::MAX_NAME_LENGTH {
            return Err(Error::TooLong);
        }
        if !self.existing.insert(name.to_owned()) {
            return Err(Error::Used);
        }
        match self.mapping.entry(id) {
            Entry::Occupied(_) => Err(Error::Assigned),
            Entry::Vacant(v) => {
                v.insert(name.to_owned());
                self.reverse_mapping.insert(name.to_owned(), id);
                Ok(name.to_owned())
            }
        }
    }

    /// Assigns a freshly generated name to a player
    ///
    /// Generated candidates are retried until one does not collide with an
    /// existing name in the session.
    ///
    /// # Errors
    ///
    /// Returns `Error::Assigned` if the player already has a name.
    pub fn assign_generated(&mut self, id: Id) -> Result<String, Error> {
        loop {
            let candidate = generate();
            if !self.existing.contains(&candidate) {
                return self.set_name(id, &candidate);
            }
        }
    }

    /// Retrieves the player ID associated with a name
    ///
    /// # Arguments
    ///
    /// * `name` - The name to look up
    ///
    /// # Returns
    ///
    /// The player ID if the name is assigned, otherwise `None`
    pub fn get_id(&self, name: &str) -> Option<Id> {
        self.reverse_mapping.get(name).copied()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_names_set_and_get() {
        let mut names = Names::default();
        let id = Id::new();

        let result = names.set_name(id, "TestPlayer");
        assert_eq!(result, Ok("TestPlayer".to_owned()));

        assert_eq!(names.get_name(&id), Some("TestPlayer".to_owned()));
        assert_eq!(names.get_id("TestPlayer"), Some(id));
    }

    #[test]
    fn test_names_too_long() {
        let mut names = Names::default();
        let long_name = "a".repeat(constants::player::MAX_NAME_LENGTH + 1);
        assert_eq!(names.set_name(Id::new(), &long_name), Err(Error::TooLong));
    }

    #[test]
    fn test_names_max_length_allowed() {
        let mut names = Names::default();
        let max_name = "a".repeat(constants::player::MAX_NAME_LENGTH);
        assert_eq!(names.set_name(Id::new(), &max_name), Ok(max_name));
    }

    #[test]
    fn test_names_duplicate_error() {
        let mut names = Names::default();
        names.set_name(Id::new(), "Player").unwrap();
        assert_eq!(names.set_name(Id::new(), "Player"), Err(Error::Used));
    }

    #[test]
    fn test_names_case_sensitivity() {
        let mut names = Names::default();
        let id1 = Id::new();
        let id2 = Id::new();

        names.set_name(id1, "Player").unwrap();
        // Different case is a different name
        assert!(names.set_name(id2, "player").is_ok());

        assert_eq!(names.get_id("Player"), Some(id1));
        assert_eq!(names.get_id("player"), Some(id2));
    }

    #[test]
    fn test_names_already_assigned_error() {
        let mut names = Names::default();
        let id = Id::new();

        names.set_name(id, "FirstName").unwrap();
        assert_eq!(names.set_name(id, "SecondName"), Err(Error::Assigned));
        assert_eq!(names.get_name(&id), Some("FirstName".to_owned()));
    }

    #[test]
    fn test_generated_name_format() {
        let name = generate();
        assert_eq!(
            name.len(),
            constants::player::GENERATED_NAME_LETTERS + constants::player::GENERATED_NAME_DIGITS
        );
        let (letters, digits) = name.split_at(constants::player::GENERATED_NAME_LETTERS);
        assert!(letters.chars().all(|c| c.is_ascii_lowercase()));
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generated_name_has_no_repetitions() {
        for _ in 0..50 {
            let name = generate();
            let (letters, digits) = name.split_at(constants::player::GENERATED_NAME_LETTERS);
            let mut seen = std::collections::HashSet::new();
            assert!(letters.chars().all(|c| seen.insert(c)));
            seen.clear();
            assert!(digits.chars().all(|c| seen.insert(c)));
        }
    }

    #[test]
    fn test_consecutive_generated_names_are_distinct() {
        let mut names = Names::default();
        let first = names.assign_generated(Id::new()).unwrap();
        let second = names.assign_generated(Id::new()).unwrap();
        assert_ne!(first, second);
        assert!(names.get_id(&first).is_some());
        assert!(names.get_id(&second).is_some());
    }

    #[test]
    fn test_names_serialization_rebuilds_lookups() {
        let mut original = Names::default();
        let id = Id::new();
        original.set_name(id, "TestPlayer").unwrap();

        let serialized = serde_json::to_string(&original).unwrap();
        let mut deserialized: Names = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.get_id("TestPlayer"), Some(id));
        assert_eq!(
            deserialized.set_name(Id::new(), "TestPlayer"),
            Err(Error::Used)
        );
    }
}
