//! Question bank entries and validation
//!
//! This module defines the questions and answers that make up a quiz,
//! along with the validation applied when an administrator creates or
//! replaces a question. Answers are tagged correct/incorrect and carry a
//! display colour drawn pseudo-randomly from a fixed palette, with no
//! colour repeated within one question.

use std::{
    collections::HashSet,
    fmt::Display,
    str::FromStr,
    time::Duration,
};

use enum_map::Enum;
use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

use crate::constants;

/// A unique identifier for a question
///
/// The ID is stable for the life of the question: replacing a question's
/// body via update keeps the same ID.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct QuestionId(Uuid);

impl QuestionId {
    /// Creates a new random question ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuestionId {
    /// Creates a new random question ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for QuestionId {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QuestionId {
    type Err = uuid::Error;

    /// Parses a question ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A unique identifier for an answer within a question
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct AnswerId(Uuid);

impl AnswerId {
    /// Creates a new random answer ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnswerId {
    /// Creates a new random answer ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AnswerId {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AnswerId {
    type Err = uuid::Error;

    /// Parses an answer ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Display colour assigned to an answer
///
/// Colours come from a fixed palette and are assigned when the question is
/// created, not supplied by the administrator. The palette is larger than
/// the maximum answer count so every answer in a question gets a distinct
/// colour.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Enum,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Colour {
    /// Red
    #[display("red")]
    Red,
    /// Blue
    #[display("blue")]
    Blue,
    /// Green
    #[display("green")]
    Green,
    /// Yellow
    #[display("yellow")]
    Yellow,
    /// Purple
    #[display("purple")]
    Purple,
    /// Brown
    #[display("brown")]
    Brown,
    /// Orange
    #[display("orange")]
    Orange,
}

impl Colour {
    /// Draws `count` distinct colours from the palette in random order
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the palette size; validated question
    /// payloads never do.
    fn draw(count: usize) -> Vec<Colour> {
        let mut palette = (0..Self::LENGTH).map(Self::from_usize).collect_vec();
        (0..count)
            .map(|_| palette.swap_remove(fastrand::usize(..palette.len())))
            .collect()
    }
}

/// Errors for rules that span more than one field of a question payload
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Two answers on the question carry exactly the same text
    #[error("answer texts within a question must be distinct")]
    DuplicateAnswerText,
    /// No answer on the question is marked correct
    #[error("question must have at least one correct answer")]
    NoCorrectAnswer,
}

type ValidationResult = garde::Result;

/// Validates the answer window length of a question
///
/// A single question can never exceed the whole-quiz duration budget, so
/// the upper bound doubles as a sanity cap here; the cross-question budget
/// is enforced by the owning quiz.
fn validate_answer_window(val: &Duration) -> ValidationResult {
    if (1..=constants::quiz::MAX_DURATION_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "duration is outside of the bounds [1,{}]",
            constants::quiz::MAX_DURATION_SECONDS,
        )))
    }
}

/// Validates a thumbnail URL
///
/// The URL must begin with `http://` or `https://` and end with `.jpg`,
/// `.jpeg` or `.png` (extension matched case-insensitively).
fn validate_thumbnail(val: &str) -> ValidationResult {
    if !(val.starts_with("http://") || val.starts_with("https://")) {
        return Err(garde::Error::new(
            "thumbnail must begin with http:// or https://",
        ));
    }
    let lowered = val.to_lowercase();
    if [".jpg", ".jpeg", ".png"]
        .iter()
        .any(|ext| lowered.ends_with(ext))
    {
        Ok(())
    } else {
        Err(garde::Error::new(
            "thumbnail must end with .jpg, .jpeg, or .png",
        ))
    }
}

/// One answer option in a question payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerConfig {
    /// The answer text shown to players
    #[garde(length(min = constants::answer_text::MIN_LENGTH, max = constants::answer_text::MAX_LENGTH))]
    pub text: String,
    /// Whether this answer is correct
    #[garde(skip)]
    pub correct: bool,
}

/// Payload for creating or replacing a question
///
/// Field-level rules live in `garde` attributes; rules spanning several
/// fields (duplicate answer text, at least one correct answer) are checked
/// separately in [`QuestionConfig::check_composition`].
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionConfig {
    /// The question text shown to players
    #[garde(length(min = constants::question::MIN_TEXT_LENGTH, max = constants::question::MAX_TEXT_LENGTH))]
    pub text: String,
    /// How long the answer window stays open
    #[garde(custom(|v, _| validate_answer_window(v)))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub duration: Duration,
    /// Points awarded to the fastest correct submitter
    #[garde(range(min = constants::question::MIN_POINTS, max = constants::question::MAX_POINTS))]
    pub points: u32,
    /// The answer options for this question
    #[garde(length(min = constants::question::MIN_ANSWER_COUNT, max = constants::question::MAX_ANSWER_COUNT), dive)]
    pub answers: Vec<AnswerConfig>,
    /// Optional thumbnail URL
    #[garde(inner(custom(|v, _| validate_thumbnail(v))))]
    pub thumbnail: Option<String>,
}

impl QuestionConfig {
    /// Checks the rules that span more than one field
    ///
    /// Answer texts are compared with a case-sensitive exact match.
    ///
    /// # Errors
    ///
    /// * [`Error::DuplicateAnswerText`] - two answers share the same text
    /// * [`Error::NoCorrectAnswer`] - no answer is marked correct
    pub fn check_composition(&self) -> Result<(), Error> {
        if self
            .answers
            .iter()
            .map(|answer| &answer.text)
            .duplicates()
            .next()
            .is_some()
        {
            return Err(Error::DuplicateAnswerText);
        }
        if !self.answers.iter().any(|answer| answer.correct) {
            return Err(Error::NoCorrectAnswer);
        }
        Ok(())
    }
}

/// One answer option of a stored question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Unique identifier of this answer
    pub id: AnswerId,
    /// The answer text shown to players
    pub text: String,
    /// Whether this answer is correct
    pub correct: bool,
    /// The display colour assigned at creation time
    pub colour: Colour,
}

/// A stored question belonging to exactly one quiz
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    duration: Duration,
    points: u32,
    answers: Vec<Answer>,
    thumbnail: Option<String>,
}

/// A question as shown to players: the `correct` flags are withheld
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    /// Unique identifier of the question
    pub question_id: QuestionId,
    /// The question text
    pub text: String,
    /// How long the answer window stays open
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub duration: Duration,
    /// Points awarded to the fastest correct submitter
    pub points: u32,
    /// The answer options, without correctness
    pub answers: Vec<AnswerView>,
    /// Optional thumbnail URL
    pub thumbnail: Option<String>,
}

/// An answer option as shown to players
#[derive(Debug, Clone, Serialize)]
pub struct AnswerView {
    /// Unique identifier of the answer
    pub answer_id: AnswerId,
    /// The answer text
    pub text: String,
    /// The display colour
    pub colour: Colour,
}

impl Question {
    /// Builds a question from a validated payload
    ///
    /// Runs field validation and composition checks, then assigns a fresh
    /// question ID, fresh answer IDs, and distinct display colours.
    ///
    /// # Errors
    ///
    /// Returns the field validation report or composition error of the
    /// payload.
    pub fn from_config(config: &QuestionConfig) -> Result<Self, crate::Error> {
        config.validate()?;
        config.check_composition()?;

        let colours = Colour::draw(config.answers.len());
        Ok(Self {
            id: QuestionId::new(),
            text: config.text.clone(),
            duration: config.duration,
            points: config.points,
            answers: config
                .answers
                .iter()
                .zip(colours)
                .map(|(answer, colour)| Answer {
                    id: AnswerId::new(),
                    text: answer.text.clone(),
                    correct: answer.correct,
                    colour,
                })
                .collect(),
            thumbnail: config.thumbnail.clone(),
        })
    }

    /// Returns the unique identifier of this question
    pub fn id(&self) -> QuestionId {
        self.id
    }

    /// Returns the question text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns how long the answer window stays open
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns the points awarded to the fastest correct submitter
    pub fn points(&self) -> u32 {
        self.points
    }

    /// Returns the answer options
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Checks whether an answer ID belongs to this question
    pub fn contains_answer(&self, id: AnswerId) -> bool {
        self.answers.iter().any(|answer| answer.id == id)
    }

    /// Returns the set of correct answer IDs
    pub fn correct_ids(&self) -> HashSet<AnswerId> {
        self.answers
            .iter()
            .filter(|answer| answer.correct)
            .map(|answer| answer.id)
            .collect()
    }

    /// Copies this question with fresh question and answer IDs
    ///
    /// Content and colours are preserved. Used when an administrator
    /// duplicates a question in place.
    pub fn duplicate(&self) -> Self {
        Self {
            id: QuestionId::new(),
            text: self.text.clone(),
            duration: self.duration,
            points: self.points,
            answers: self
                .answers
                .iter()
                .map(|answer| Answer {
                    id: AnswerId::new(),
                    ..answer.clone()
                })
                .collect(),
            thumbnail: self.thumbnail.clone(),
        }
    }

    /// Replaces the body of this question from a validated payload
    ///
    /// The question ID is stable across updates; answers get fresh IDs and
    /// colours like a newly created question.
    ///
    /// # Errors
    ///
    /// Returns the field validation report or composition error of the
    /// payload.
    pub fn replace_from_config(&mut self, config: &QuestionConfig) -> Result<(), crate::Error> {
        let replacement = Self::from_config(config)?;
        *self = Self {
            id: self.id,
            ..replacement
        };
        Ok(())
    }

    /// Returns this question as players see it, without correctness flags
    pub fn player_view(&self) -> QuestionView {
        QuestionView {
            question_id: self.id,
            text: self.text.clone(),
            duration: self.duration,
            points: self.points,
            answers: self
                .answers
                .iter()
                .map(|answer| AnswerView {
                    answer_id: answer.id,
                    text: answer.text.clone(),
                    colour: answer.colour,
                })
                .collect(),
            thumbnail: self.thumbnail.clone(),
        }
    }
}
