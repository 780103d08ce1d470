//! Quiz aggregate and question-bank operations
//!
//! A quiz is owned by one administrator and carries an ordered sequence of
//! questions. This module validates quiz metadata and implements the
//! question-bank operations (create, update, delete, move, duplicate),
//! including the whole-quiz duration budget. Whether a quiz may be edited
//! at all while sessions are running is decided by the store, which knows
//! about sessions.

pub mod question;

use std::{fmt::Display, str::FromStr, time::Duration};

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;
use web_time::SystemTime;

use crate::{constants, identity::UserId};

use question::{Question, QuestionConfig, QuestionId};

/// A unique identifier for a quiz
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct QuizId(Uuid);

impl QuizId {
    /// Creates a new random quiz ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuizId {
    /// Creates a new random quiz ID (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for QuizId {
    /// Formats the ID as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QuizId {
    type Err = uuid::Error;

    /// Parses a quiz ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Errors that can occur in quiz metadata and question-bank bookkeeping
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The owner already has a live quiz with this name
    #[error("quiz name is already used by another quiz of this owner")]
    NameTaken,
    /// The combined question durations would exceed the quiz budget
    #[error("combined question durations would exceed the quiz limit")]
    DurationBudgetExceeded,
    /// The question ID does not belong to this quiz
    #[error("question does not exist in this quiz")]
    UnknownQuestion,
    /// The move target is the current position or out of range
    #[error("target position is out of range or unchanged")]
    BadPosition,
}

type ValidationResult = garde::Result;

/// Validates the character set of a quiz name
///
/// Only alphanumeric characters and spaces are permitted.
fn validate_name_characters(val: &str) -> ValidationResult {
    if val.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ') {
        Ok(())
    } else {
        Err(garde::Error::new(
            "name may only contain alphanumeric characters and spaces",
        ))
    }
}

/// Payload for creating a quiz or renaming/redescribing one
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuizConfig {
    /// The quiz name, unique per owner among live quizzes
    #[garde(length(min = constants::quiz::MIN_NAME_LENGTH, max = constants::quiz::MAX_NAME_LENGTH), custom(|v, _| validate_name_characters(v)))]
    pub name: String,
    /// Free-form description, may be empty
    #[garde(length(max = constants::quiz::MAX_DESCRIPTION_LENGTH))]
    pub description: String,
}

/// Summary of a quiz for listings and status views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizInfo {
    /// Unique identifier of the quiz
    pub quiz_id: QuizId,
    /// The quiz name
    pub name: String,
    /// The quiz description
    pub description: String,
    /// Unix seconds when the quiz was created
    pub time_created: u64,
    /// Unix seconds when the quiz was last edited
    pub time_last_edited: u64,
    /// Number of questions on the quiz
    pub num_questions: usize,
    /// Combined duration of all questions, in seconds
    pub duration_seconds: u64,
}

/// Returns the current time in unix seconds
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// A quiz owned by one administrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    id: QuizId,
    owner: UserId,
    name: String,
    description: String,
    time_created: u64,
    time_last_edited: u64,
    questions: Vec<Question>,
}

impl Quiz {
    /// Creates a new quiz from a validated payload
    ///
    /// Name uniqueness among the owner's quizzes is the store's concern;
    /// everything field-shaped is validated here.
    ///
    /// # Errors
    ///
    /// Returns the field validation report of the payload.
    pub fn new(owner: UserId, config: &QuizConfig) -> Result<Self, crate::Error> {
        config.validate()?;
        let now = unix_now();
        Ok(Self {
            id: QuizId::new(),
            owner,
            name: config.name.clone(),
            description: config.description.clone(),
            time_created: now,
            time_last_edited: now,
            questions: Vec::new(),
        })
    }

    /// Returns the unique identifier of this quiz
    pub fn id(&self) -> QuizId {
        self.id
    }

    /// Returns the owning administrator
    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Checks whether `user` owns this quiz
    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == user
    }

    /// Returns the quiz name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the quiz description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the questions in order
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Returns the number of questions on this quiz
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks if this quiz has no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Returns the combined duration of all questions
    pub fn total_duration(&self) -> Duration {
        self.questions.iter().map(Question::duration).sum()
    }

    /// Returns a summary of this quiz
    pub fn info(&self) -> QuizInfo {
        QuizInfo {
            quiz_id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            time_created: self.time_created,
            time_last_edited: self.time_last_edited,
            num_questions: self.questions.len(),
            duration_seconds: self.total_duration().as_secs(),
        }
    }

    /// Stamps the quiz as edited now
    fn touch(&mut self) {
        self.time_last_edited = unix_now();
    }

    /// Renames the quiz
    ///
    /// # Errors
    ///
    /// Returns the field validation report if the name is malformed.
    pub fn rename(&mut self, name: &str) -> Result<(), crate::Error> {
        let config = QuizConfig {
            name: name.to_owned(),
            description: self.description.clone(),
        };
        config.validate()?;
        self.name = config.name;
        self.touch();
        Ok(())
    }

    /// Replaces the quiz description
    ///
    /// # Errors
    ///
    /// Returns the field validation report if the description is too long.
    pub fn set_description(&mut self, description: &str) -> Result<(), crate::Error> {
        let config = QuizConfig {
            name: self.name.clone(),
            description: description.to_owned(),
        };
        config.validate()?;
        self.description = config.description;
        self.touch();
        Ok(())
    }

    /// Checks that adding `extra` seconds of question time stays in budget
    fn check_duration_budget(&self, extra: Duration, replacing: Option<&Question>) -> Result<(), Error> {
        let current = self.total_duration() - replacing.map_or(Duration::ZERO, Question::duration);
        if (current + extra).as_secs() > constants::quiz::MAX_DURATION_SECONDS {
            return Err(Error::DurationBudgetExceeded);
        }
        Ok(())
    }

    /// Finds the index of a question by ID
    fn position_of(&self, question_id: QuestionId) -> Result<usize, Error> {
        self.questions
            .iter()
            .position(|question| question.id() == question_id)
            .ok_or(Error::UnknownQuestion)
    }

    /// Appends a new question built from `config`
    ///
    /// # Returns
    ///
    /// The ID assigned to the new question.
    ///
    /// # Errors
    ///
    /// Returns the payload's validation failure, or
    /// [`Error::DurationBudgetExceeded`] if the combined question durations
    /// would pass the quiz limit.
    pub fn create_question(&mut self, config: &QuestionConfig) -> Result<QuestionId, crate::Error> {
        let question = Question::from_config(config)?;
        self.check_duration_budget(question.duration(), None)?;
        let id = question.id();
        self.questions.push(question);
        self.touch();
        Ok(id)
    }

    /// Replaces the body of an existing question
    ///
    /// The question keeps its ID and position; the replacement payload is
    /// validated exactly like a new question, with the replaced question's
    /// own duration excluded from the budget.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownQuestion`], the payload's validation
    /// failure, or [`Error::DurationBudgetExceeded`].
    pub fn update_question(
        &mut self,
        question_id: QuestionId,
        config: &QuestionConfig,
    ) -> Result<(), crate::Error> {
        let index = self.position_of(question_id)?;
        self.check_duration_budget(config.duration, Some(&self.questions[index]))?;
        self.questions[index].replace_from_config(config)?;
        self.touch();
        Ok(())
    }

    /// Removes a question from the quiz
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownQuestion`] if the ID is not on this quiz.
    pub fn delete_question(&mut self, question_id: QuestionId) -> Result<(), crate::Error> {
        let index = self.position_of(question_id)?;
        self.questions.remove(index);
        self.touch();
        Ok(())
    }

    /// Moves a question to a new 0-based position
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownQuestion`] if the ID is not on this quiz, or
    /// [`Error::BadPosition`] if the target is out of range or equals the
    /// question's current position.
    pub fn move_question(
        &mut self,
        question_id: QuestionId,
        new_position: usize,
    ) -> Result<(), crate::Error> {
        let index = self.position_of(question_id)?;
        if new_position >= self.questions.len() || new_position == index {
            return Err(Error::BadPosition.into());
        }
        let question = self.questions.remove(index);
        self.questions.insert(new_position, question);
        self.touch();
        Ok(())
    }

    /// Duplicates a question, inserting the copy right after the original
    ///
    /// # Returns
    ///
    /// The ID assigned to the copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownQuestion`] if the ID is not on this quiz, or
    /// [`Error::DurationBudgetExceeded`] if the copy would pass the
    /// duration limit.
    pub fn duplicate_question(
        &mut self,
        question_id: QuestionId,
    ) -> Result<QuestionId, crate::Error> {
        let index = self.position_of(question_id)?;
        self.check_duration_budget(self.questions[index].duration(), None)?;
        let copy = self.questions[index].duplicate();
        let id = copy.id();
        self.questions.insert(index + 1, copy);
        self.touch();
        Ok(id)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use super::{question::AnswerConfig, *};

    fn quiz_config() -> QuizConfig {
        QuizConfig {
            name: "Capitals 101".to_owned(),
            description: "A quiz about capitals".to_owned(),
        }
    }

    fn question_config(duration_seconds: u64) -> QuestionConfig {
        QuestionConfig {
            text: "What is the capital of France?".to_owned(),
            duration: Duration::from_secs(duration_seconds),
            points: 5,
            answers: vec![
                AnswerConfig {
                    text: "Paris".to_owned(),
                    correct: true,
                },
                AnswerConfig {
                    text: "Lyon".to_owned(),
                    correct: false,
                },
            ],
            thumbnail: None,
        }
    }

    fn quiz() -> Quiz {
        Quiz::new(UserId::new(), &quiz_config()).unwrap()
    }

    #[test]
    fn test_quiz_name_rules() {
        let mut config = quiz_config();
        config.name = "ab".to_owned();
        assert!(config.validate().is_err());

        config.name = "a".repeat(constants::quiz::MAX_NAME_LENGTH + 1);
        assert!(config.validate().is_err());

        config.name = "no-hyphens!".to_owned();
        assert!(config.validate().is_err());

        config.name = "Spaces are fine 42".to_owned();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_description_length_rule() {
        let mut config = quiz_config();
        config.description = "a".repeat(constants::quiz::MAX_DESCRIPTION_LENGTH + 1);
        assert!(config.validate().is_err());

        config.description = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_quiz_has_matching_timestamps() {
        let quiz = quiz();
        assert_eq!(quiz.time_created, quiz.time_last_edited);
        assert!(quiz.is_empty());
    }

    #[test]
    fn test_create_question_appends_and_touches() {
        let mut quiz = quiz();
        let before = quiz.time_last_edited;
        let id = quiz.create_question(&question_config(30)).unwrap();

        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz.questions()[0].id(), id);
        assert!(quiz.time_last_edited >= before);
    }

    #[test]
    fn test_duration_budget_on_create() {
        let mut quiz = quiz();
        quiz.create_question(&question_config(100)).unwrap();
        quiz.create_question(&question_config(80)).unwrap();
        let error = quiz.create_question(&question_config(1)).unwrap_err();
        assert!(matches!(
            error,
            crate::Error::Quiz(Error::DurationBudgetExceeded)
        ));
        assert_eq!(quiz.len(), 2);
    }

    #[test]
    fn test_duration_budget_excludes_replaced_question_on_update() {
        let mut quiz = quiz();
        let id = quiz.create_question(&question_config(100)).unwrap();
        quiz.create_question(&question_config(80)).unwrap();

        // Shrinking the first question is fine even though the quiz is full
        quiz.update_question(id, &question_config(90)).unwrap();
        assert_eq!(quiz.total_duration(), Duration::from_secs(170));

        // Growing past the budget is not
        let error = quiz.update_question(id, &question_config(101)).unwrap_err();
        assert!(matches!(
            error,
            crate::Error::Quiz(Error::DurationBudgetExceeded)
        ));
    }

    #[test]
    fn test_update_unknown_question() {
        let mut quiz = quiz();
        let error = quiz
            .update_question(QuestionId::new(), &question_config(10))
            .unwrap_err();
        assert!(matches!(error, crate::Error::Quiz(Error::UnknownQuestion)));
    }

    #[test]
    fn test_delete_question() {
        let mut quiz = quiz();
        let id = quiz.create_question(&question_config(30)).unwrap();
        quiz.delete_question(id).unwrap();
        assert!(quiz.is_empty());
        assert!(quiz.delete_question(id).is_err());
    }

    #[test]
    fn test_move_question() {
        let mut quiz = quiz();
        let first = quiz.create_question(&question_config(10)).unwrap();
        let second = quiz.create_question(&question_config(10)).unwrap();
        let third = quiz.create_question(&question_config(10)).unwrap();

        quiz.move_question(third, 0).unwrap();
        let order: Vec<_> = quiz.questions().iter().map(Question::id).collect();
        assert_eq!(order, vec![third, first, second]);
    }

    #[test]
    fn test_move_question_rejects_current_and_out_of_range() {
        let mut quiz = quiz();
        let first = quiz.create_question(&question_config(10)).unwrap();
        quiz.create_question(&question_config(10)).unwrap();

        let same = quiz.move_question(first, 0).unwrap_err();
        assert!(matches!(same, crate::Error::Quiz(Error::BadPosition)));

        let out_of_range = quiz.move_question(first, 2).unwrap_err();
        assert!(matches!(out_of_range, crate::Error::Quiz(Error::BadPosition)));
    }

    #[test]
    fn test_duplicate_question_inserts_after_original() {
        let mut quiz = quiz();
        let first = quiz.create_question(&question_config(10)).unwrap();
        let second = quiz.create_question(&question_config(10)).unwrap();

        let copy = quiz.duplicate_question(first).unwrap();
        let order: Vec<_> = quiz.questions().iter().map(Question::id).collect();
        assert_eq!(order, vec![first, copy, second]);
    }

    #[test]
    fn test_duplicate_question_respects_budget() {
        let mut quiz = quiz();
        let id = quiz.create_question(&question_config(100)).unwrap();
        let error = quiz.duplicate_question(id).unwrap_err();
        assert!(matches!(
            error,
            crate::Error::Quiz(Error::DurationBudgetExceeded)
        ));
        assert_eq!(quiz.len(), 1);
    }

    #[test]
    fn test_rename_and_set_description() {
        let mut quiz = quiz();
        quiz.rename("Capitals 202").unwrap();
        assert_eq!(quiz.name(), "Capitals 202");
        assert!(quiz.rename("x").is_err());

        quiz.set_description("updated").unwrap();
        assert_eq!(quiz.description(), "updated");
    }

    #[test]
    fn test_info_summarises_quiz() {
        let mut quiz = quiz();
        quiz.create_question(&question_config(30)).unwrap();
        let info = quiz.info();
        assert_eq!(info.quiz_id, quiz.id());
        assert_eq!(info.num_questions, 1);
        assert_eq!(info.duration_seconds, 30);
    }
}
