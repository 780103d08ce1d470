//! Session lifecycle state machine
//!
//! This module contains the core of the engine: one live session of a quiz,
//! from its lobby through timed question windows to final results. The
//! session owns a frozen snapshot of the quiz's questions (taken when the
//! session starts, so later edits to the quiz never affect it), the joined
//! players, their submissions, and the chat log.
//!
//! Timed transitions are armed through a `schedule` closure supplied by the
//! caller and delivered back through [`Session::receive_alarm`]. Every armed
//! timer carries the session's generation counter; any state change bumps
//! the generation, so a timer that was logically cancelled (by `SkipCountdown`,
//! `End`, or simply being superseded) no-ops when its alarm finally arrives.
//! At most one timer is ever live per session.

use std::collections::HashMap;
use std::time::Duration;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::SystemTime;

use crate::{
    chat,
    constants,
    player::{self, Players},
    quiz::{
        Quiz, QuizId,
        question::{AnswerId, Question, QuestionView},
    },
    results::{self, FinalResults, QuestionResult},
    session_id::SessionId,
};

/// Lifecycle states of a session
///
/// `End` is terminal and reachable from every other state. The remaining
/// states cycle once per question: a fixed countdown, an open answer
/// window, a closed window, and an answer reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// Waiting for players to join; the session has not started
    Lobby,
    /// A question is queued and the countdown to it is running
    QuestionCountdown,
    /// The answer window for the current question is open
    QuestionOpen,
    /// The answer window has closed; nothing is revealed yet
    QuestionClose,
    /// Correct answers and per-question results are revealed
    AnswerShow,
    /// The aggregated session outcome is available
    FinalResults,
    /// The session is over; kept only for historical result queries
    End,
}

/// Administrator-issued actions on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Queue the next question and start its countdown
    NextQuestion,
    /// Cut the countdown short and open the question now
    SkipCountdown,
    /// Reveal the correct answers
    GoToAnswer,
    /// Jump to the aggregated session outcome
    GoToFinalResults,
    /// Terminate the session
    End,
}

/// Errors that can occur when driving or querying a session
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The action is not legal in the session's current state
    #[error("action {action:?} cannot be applied in state {state:?}")]
    InvalidTransition {
        /// The state the session was in
        state: State,
        /// The action that was attempted
        action: Action,
    },
    /// Every question has already been played
    #[error("there are no questions left to advance to")]
    OutOfQuestions,
    /// Players can only join before the session starts
    #[error("players can only join while the session is in the lobby")]
    NotInLobby,
    /// The player ID does not belong to this session
    #[error("player is not part of this session")]
    UnknownPlayer,
    /// The given question position is not the one currently up
    #[error("question position does not match the question currently up")]
    WrongPosition,
    /// The answer window is not open
    #[error("answers can only be submitted while the question is open")]
    SubmissionsClosed,
    /// The submitted answer ids are empty, repeated, or foreign
    #[error("submitted answer ids must be non-empty, distinct, and belong to the current question")]
    MalformedSubmission,
    /// Results cannot be read in the session's current state
    #[error("results are not available in the current state")]
    ResultsUnavailable,
    /// The question was never opened before the session moved on
    #[error("this question was never opened during the session")]
    QuestionNotPlayed,
    /// No question is up in the current state
    #[error("no question is up in the current state")]
    NoQuestionUp,
}

/// A deferred transition, fired back by the host runtime's timer
///
/// Alarms are fire-and-forget for the host: a stale alarm (wrong
/// generation, or a session that no longer exists) is silently dropped on
/// delivery, which is how cancellation works in a sans-io crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Move `session` to `to`, provided `generation` is still current
    Advance {
        /// The session the timer was armed for
        session: SessionId,
        /// The session's generation when the timer was armed
        generation: u64,
        /// The state the timer should move the session to
        to: State,
    },
}

/// One player's retained submission for one question
///
/// At most one submission is kept per player per question; resubmitting
/// overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// The chosen answer ids
    pub answer_ids: Vec<AnswerId>,
    /// When the submission arrived
    pub submitted_at: SystemTime,
}

/// The record of one played question
///
/// Created the moment the question opens; the open timestamp anchors the
/// average-answer-time computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// When the answer window opened
    pub opened_at: SystemTime,
    /// Retained submissions keyed by player
    pub submissions: HashMap<player::Id, Submission>,
}

/// Admin-facing status of a session
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    /// Current lifecycle state
    pub state: State,
    /// 1-based position of the current question, 0 before the first
    pub at_question: usize,
    /// Player names in join order
    pub players: Vec<String>,
    /// Identity of the quiz the snapshot was taken from
    pub quiz_id: QuizId,
    /// Name of the quiz at snapshot time
    pub quiz_name: String,
    /// Number of questions in the snapshot
    pub num_questions: usize,
}

/// Player-facing status of a session
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
    /// Current lifecycle state
    pub state: State,
    /// Number of questions in the session
    pub num_questions: usize,
    /// 1-based position of the current question, 0 before the first
    pub at_question: usize,
}

/// One live session of a quiz
#[derive(Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    quiz_id: QuizId,
    quiz_name: String,
    /// Frozen copy of the quiz's questions, taken at session start
    questions: Vec<Question>,
    /// Player count that triggers auto-start, 0 to disable
    auto_start_num: usize,
    state: State,
    /// 1-based position of the current question, 0 before the first
    at_question: usize,
    /// Bumped on every state change; armed timers carry the value they
    /// were armed with and are dropped when it no longer matches
    generation: u64,
    /// One record per question that was opened, in play order
    rounds: Vec<Round>,
    players: Players,
    chat: chat::Log,
    /// Final outcome, computed once after reaching FinalResults
    #[serde(skip)]
    final_results: once_cell_serde::sync::OnceCell<FinalResults>,
}

impl std::fmt::Debug for Session {
    /// Custom debug implementation that avoids printing the whole snapshot
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("at_question", &self.at_question)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session in the lobby with a frozen copy of `quiz`'s
    /// questions
    ///
    /// Preconditions (a non-empty quiz, the per-quiz session limit, the
    /// auto-start bound) are the store's responsibility.
    pub(crate) fn new(id: SessionId, quiz: &Quiz, auto_start_num: usize) -> Self {
        Self {
            id,
            quiz_id: quiz.id(),
            quiz_name: quiz.name().to_owned(),
            questions: quiz.questions().to_vec(),
            auto_start_num,
            state: State::Lobby,
            at_question: 0,
            generation: 0,
            rounds: Vec::new(),
            players: Players::default(),
            chat: chat::Log::default(),
            final_results: once_cell_serde::sync::OnceCell::new(),
        }
    }

    /// Returns this session's ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the quiz this session was started from
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    /// Returns the current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the 1-based position of the current question (0 in the lobby)
    pub fn at_question(&self) -> usize {
        self.at_question
    }

    /// Checks whether the session still counts against the per-quiz limit
    pub fn is_active(&self) -> bool {
        self.state != State::End
    }

    /// Returns the joined players
    pub fn players(&self) -> &Players {
        &self.players
    }

    /// Returns the question currently up, if any
    fn current_question(&self) -> Option<&Question> {
        self.at_question
            .checked_sub(1)
            .and_then(|index| self.questions.get(index))
    }

    /// Records the state change
    fn set_state(&mut self, to: State) {
        log::debug!("session {}: {:?} -> {:?}", self.id, self.state, to);
        self.state = to;
    }

    /// Invalidates any armed timer without arming a new one
    fn disarm(&mut self) {
        self.generation += 1;
    }

    /// Arms the single timer of this session
    ///
    /// Bumping the generation first makes any previously armed timer stale,
    /// so at most one live timer exists per session.
    fn arm<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        to: State,
        after: Duration,
        schedule: &mut S,
    ) {
        self.generation += 1;
        schedule(
            AlarmMessage::Advance {
                session: self.id,
                generation: self.generation,
                to,
            },
            after,
        );
    }

    /// Applies an administrator action
    ///
    /// Exactly the transitions of the lifecycle table are accepted; every
    /// other (state, action) pair fails with [`Error::InvalidTransition`]
    /// and leaves the session untouched.
    ///
    /// # Arguments
    ///
    /// * `action` - The action to apply
    /// * `schedule` - Callback used to arm the countdown/answer-window timer
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidTransition`] - the action is not legal right now
    /// * [`Error::OutOfQuestions`] - `NextQuestion` past the last question
    pub fn apply<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        action: Action,
        mut schedule: S,
    ) -> Result<(), Error> {
        match (self.state, action) {
            (
                State::Lobby | State::QuestionClose | State::AnswerShow,
                Action::NextQuestion,
            ) => self.queue_next_question(&mut schedule),
            (State::QuestionCountdown, Action::SkipCountdown) => {
                self.open_question(&mut schedule);
                Ok(())
            }
            (State::QuestionOpen | State::QuestionClose, Action::GoToAnswer) => {
                self.disarm();
                self.set_state(State::AnswerShow);
                Ok(())
            }
            (State::QuestionClose | State::AnswerShow, Action::GoToFinalResults) => {
                self.disarm();
                self.set_state(State::FinalResults);
                Ok(())
            }
            (state, Action::End) if state != State::End => {
                self.disarm();
                self.set_state(State::End);
                Ok(())
            }
            (state, action) => Err(Error::InvalidTransition { state, action }),
        }
    }

    /// Queues the next question and starts its countdown
    fn queue_next_question<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        schedule: &mut S,
    ) -> Result<(), Error> {
        if self.at_question >= self.questions.len() {
            return Err(Error::OutOfQuestions);
        }
        self.at_question += 1;
        self.set_state(State::QuestionCountdown);
        self.arm(
            State::QuestionOpen,
            Duration::from_secs(constants::session::COUNTDOWN_SECONDS),
            schedule,
        );
        Ok(())
    }

    /// Opens the current question's answer window
    ///
    /// Reached from the countdown only, either by its timer or by
    /// `SkipCountdown`, so a current question always exists.
    fn open_question<S: FnMut(AlarmMessage, Duration)>(&mut self, schedule: &mut S) {
        let window = self
            .current_question()
            .map_or(Duration::ZERO, Question::duration);
        self.set_state(State::QuestionOpen);
        self.rounds.push(Round {
            opened_at: SystemTime::now(),
            submissions: HashMap::new(),
        });
        self.arm(State::QuestionClose, window, schedule);
    }

    /// Handles a fired timer
    ///
    /// The alarm is applied only if its generation is still current and the
    /// session sits in the state the timer was armed for; otherwise it is a
    /// logged no-op. Timer-driven transitions can never surface errors.
    pub fn receive_alarm<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        alarm: &AlarmMessage,
        mut schedule: S,
    ) {
        let AlarmMessage::Advance { generation, to, .. } = *alarm;
        if generation != self.generation {
            log::debug!(
                "session {}: dropping stale alarm armed at generation {generation}",
                self.id
            );
            return;
        }
        match (self.state, to) {
            (State::QuestionCountdown, State::QuestionOpen) => self.open_question(&mut schedule),
            (State::QuestionOpen, State::QuestionClose) => {
                self.disarm();
                self.set_state(State::QuestionClose);
            }
            (state, to) => {
                log::debug!(
                    "session {}: alarm into {to:?} does not apply in {state:?}",
                    self.id
                );
            }
        }
    }

    /// Adds a player to the lobby
    ///
    /// An empty name gets a generated fallback. Reaching a non-zero
    /// auto-start threshold advances the session as if `NextQuestion` had
    /// been applied.
    ///
    /// # Returns
    ///
    /// The new player's ID and assigned name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInLobby`] outside the lobby, or a name error if
    /// the requested name is taken or too long.
    pub fn join<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        requested_name: &str,
        mut schedule: S,
    ) -> Result<(player::Id, String), crate::Error> {
        if self.state != State::Lobby {
            return Err(Error::NotInLobby.into());
        }
        let (id, name) = self.players.join(requested_name)?;
        if self.auto_start_num > 0 && self.players.len() >= self.auto_start_num {
            self.queue_next_question(&mut schedule)?;
        }
        Ok((id, name))
    }

    /// Records a player's submission for the current question
    ///
    /// Validates the window, the position, and the ids before touching
    /// anything; a prior submission is overwritten only on success.
    ///
    /// # Arguments
    ///
    /// * `player` - The submitting player
    /// * `position` - The 1-based question position the player believes is up
    /// * `answer_ids` - The chosen answers
    ///
    /// # Errors
    ///
    /// * [`Error::UnknownPlayer`] - the player is not in this session
    /// * [`Error::WrongPosition`] - `position` is not the current question
    /// * [`Error::SubmissionsClosed`] - the answer window is not open
    /// * [`Error::MalformedSubmission`] - empty, repeated, or foreign ids
    pub fn submit_answer(
        &mut self,
        player: player::Id,
        position: usize,
        answer_ids: &[AnswerId],
    ) -> Result<(), Error> {
        if !self.players.contains(player) {
            return Err(Error::UnknownPlayer);
        }
        if position == 0 || position != self.at_question {
            return Err(Error::WrongPosition);
        }
        if self.state != State::QuestionOpen {
            return Err(Error::SubmissionsClosed);
        }
        let Some(question) = self.current_question() else {
            return Err(Error::WrongPosition);
        };
        if answer_ids.is_empty()
            || answer_ids.iter().duplicates().next().is_some()
            || answer_ids.iter().any(|id| !question.contains_answer(*id))
        {
            return Err(Error::MalformedSubmission);
        }
        let Some(round) = self.rounds.last_mut() else {
            return Err(Error::SubmissionsClosed);
        };
        round.submissions.insert(
            player,
            Submission {
                answer_ids: answer_ids.to_vec(),
                submitted_at: SystemTime::now(),
            },
        );
        Ok(())
    }

    /// Returns the aggregated outcome of one question
    ///
    /// Available from `AnswerShow` onwards for any position that was
    /// actually opened.
    ///
    /// # Errors
    ///
    /// * [`Error::ResultsUnavailable`] - state before `AnswerShow`
    /// * [`Error::WrongPosition`] - position 0 or past `at_question`
    /// * [`Error::QuestionNotPlayed`] - the session never opened it
    pub fn question_results(&self, position: usize) -> Result<QuestionResult, Error> {
        if !matches!(self.state, State::AnswerShow | State::FinalResults) {
            return Err(Error::ResultsUnavailable);
        }
        if position == 0 || position > self.at_question {
            return Err(Error::WrongPosition);
        }
        let round = self
            .rounds
            .get(position - 1)
            .ok_or(Error::QuestionNotPlayed)?;
        let question = self
            .questions
            .get(position - 1)
            .ok_or(Error::WrongPosition)?;
        Ok(results::question_result(question, round, &self.players))
    }

    /// Returns the final outcome of the session
    ///
    /// Computed once on first access after the session reaches
    /// `FinalResults` and cached for every later query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResultsUnavailable`] before `FinalResults`.
    pub fn final_results(&self) -> Result<&FinalResults, Error> {
        if self.state != State::FinalResults {
            return Err(Error::ResultsUnavailable);
        }
        Ok(self.final_results.get_or_init(|| {
            results::final_results(&self.questions, &self.rounds, &self.players)
        }))
    }

    /// Returns the admin-facing status of this session
    pub fn status(&self) -> Status {
        Status {
            state: self.state,
            at_question: self.at_question,
            players: self.players.names_in_join_order(),
            quiz_id: self.quiz_id,
            quiz_name: self.quiz_name.clone(),
            num_questions: self.questions.len(),
        }
    }

    /// Returns the player-facing status of this session
    pub fn player_status(&self) -> PlayerStatus {
        PlayerStatus {
            state: self.state,
            num_questions: self.questions.len(),
            at_question: self.at_question,
        }
    }

    /// Returns the current question as players see it
    ///
    /// # Errors
    ///
    /// * [`Error::NoQuestionUp`] - in the lobby or after the end
    /// * [`Error::WrongPosition`] - `position` is not the current question
    pub fn question_view(&self, position: usize) -> Result<QuestionView, Error> {
        if matches!(self.state, State::Lobby | State::End) {
            return Err(Error::NoQuestionUp);
        }
        if position == 0 || position != self.at_question {
            return Err(Error::WrongPosition);
        }
        self.current_question()
            .map(Question::player_view)
            .ok_or(Error::WrongPosition)
    }

    /// Appends a chat message from a player
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPlayer`] for foreign players or a chat error
    /// for an out-of-bounds body.
    pub fn chat_send(&mut self, sender: player::Id, body: &str) -> Result<(), crate::Error> {
        let name = self.players.name(sender).ok_or(Error::UnknownPlayer)?;
        self.chat.send(sender, name, body)?;
        Ok(())
    }

    /// Returns the session's chat log in send order
    pub fn chat_messages(&self) -> &[chat::Message] {
        self.chat.messages()
    }
}
