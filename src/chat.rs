//! Session chat log
//!
//! An append-only list of messages scoped to one session, visible to every
//! player in it. Message bodies are bounded in length; everything else is
//! recorded as-is with a timestamp.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::SystemTime;

use crate::{constants, player};

/// Errors that can occur when sending a chat message
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The message body is empty or too long
    #[error("message body must be between 1 and 100 characters")]
    BodyLength,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// ID of the player who sent the message
    pub sender: player::Id,
    /// Name of the player at the time of sending
    pub name: String,
    /// The message body
    pub body: String,
    /// When the message was sent
    pub sent_at: SystemTime,
}

/// The append-only chat log of one session
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Log {
    messages: Vec<Message>,
}

impl Log {
    /// Appends a message to the log
    ///
    /// # Errors
    ///
    /// Returns [`Error::BodyLength`] if the body is outside the permitted
    /// length range.
    pub fn send(&mut self, sender: player::Id, name: String, body: &str) -> Result<(), Error> {
        if body.len() < constants::chat::MIN_MESSAGE_LENGTH
            || body.len() > constants::chat::MAX_MESSAGE_LENGTH
        {
            return Err(Error::BodyLength);
        }
        self.messages.push(Message {
            sender,
            name,
            body: body.to_owned(),
            sent_at: SystemTime::now(),
        });
        Ok(())
    }

    /// Returns every message in send order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_view() {
        let mut log = Log::default();
        let sender = player::Id::new();
        log.send(sender, "Alice".to_owned(), "hello").unwrap();
        log.send(sender, "Alice".to_owned(), "anyone here?").unwrap();

        let messages = log.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "hello");
        assert_eq!(messages[1].body, "anyone here?");
        assert_eq!(messages[0].name, "Alice");
        assert!(messages[0].sent_at <= messages[1].sent_at);
    }

    #[test]
    fn test_empty_body_rejected() {
        let mut log = Log::default();
        assert_eq!(
            log.send(player::Id::new(), "Alice".to_owned(), ""),
            Err(Error::BodyLength)
        );
        assert!(log.messages().is_empty());
    }

    #[test]
    fn test_oversized_body_rejected() {
        let mut log = Log::default();
        let body = "a".repeat(constants::chat::MAX_MESSAGE_LENGTH + 1);
        assert_eq!(
            log.send(player::Id::new(), "Alice".to_owned(), &body),
            Err(Error::BodyLength)
        );
    }

    #[test]
    fn test_boundary_lengths_allowed() {
        let mut log = Log::default();
        let sender = player::Id::new();
        log.send(sender, "Alice".to_owned(), "x").unwrap();
        let body = "a".repeat(constants::chat::MAX_MESSAGE_LENGTH);
        log.send(sender, "Alice".to_owned(), &body).unwrap();
        assert_eq!(log.messages().len(), 2);
    }
}
