//! Configuration constants for the quiz-hosting engine
//!
//! This module contains all the limits and constraints used throughout
//! the engine to ensure data integrity and provide consistent boundaries
//! for the different components.

/// Quiz metadata configuration constants
pub mod quiz {
    /// Minimum length of a quiz name in characters
    pub const MIN_NAME_LENGTH: usize = 3;
    /// Maximum length of a quiz name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
    /// Maximum length of a quiz description in characters
    pub const MAX_DESCRIPTION_LENGTH: usize = 100;
    /// Maximum combined duration of all questions in a quiz, in seconds
    pub const MAX_DURATION_SECONDS: u64 = 180;
}

/// Question configuration constants
pub mod question {
    /// Minimum length of a question text in characters
    pub const MIN_TEXT_LENGTH: usize = 5;
    /// Maximum length of a question text in characters
    pub const MAX_TEXT_LENGTH: usize = 50;
    /// Minimum number of answers on a question
    pub const MIN_ANSWER_COUNT: usize = 2;
    /// Maximum number of answers on a question
    pub const MAX_ANSWER_COUNT: usize = 6;
    /// Minimum points awarded for answering a question correctly
    pub const MIN_POINTS: u32 = 1;
    /// Maximum points awarded for answering a question correctly
    pub const MAX_POINTS: u32 = 10;
}

/// Answer text configuration constants
pub mod answer_text {
    /// Minimum length of answer text in characters
    pub const MIN_LENGTH: usize = 1;
    /// Maximum length of answer text in characters
    pub const MAX_LENGTH: usize = 30;
}

/// Session lifecycle configuration constants
pub mod session {
    /// Length of the countdown before a question opens, in seconds
    pub const COUNTDOWN_SECONDS: u64 = 3;
    /// Maximum number of concurrent non-ended sessions per quiz
    pub const MAX_ACTIVE_SESSIONS: usize = 10;
    /// Maximum player count that may be configured to trigger auto-start
    pub const MAX_AUTO_START_NUM: usize = 50;
}

/// Player configuration constants
pub mod player {
    /// Maximum length of a player name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
    /// Number of letters in an auto-generated player name
    pub const GENERATED_NAME_LETTERS: usize = 5;
    /// Number of digits in an auto-generated player name
    pub const GENERATED_NAME_DIGITS: usize = 3;
}

/// Chat configuration constants
pub mod chat {
    /// Minimum length of a chat message body in characters
    pub const MIN_MESSAGE_LENGTH: usize = 1;
    /// Maximum length of a chat message body in characters
    pub const MAX_MESSAGE_LENGTH: usize = 100;
}
