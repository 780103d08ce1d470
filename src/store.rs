//! Owned in-memory data store and operation surface
//!
//! The [`Store`] owns every quiz (live and trashed) and every session, and
//! exposes the operations the transport collaborator maps onto its REST
//! surface. It is constructed once at process start and injected wherever
//! requests are handled.
//!
//! Mutating operations take `&mut self`, so the borrow checker serialises
//! all mutations; a multi-threaded host wraps the store in a mutex or a
//! single-threaded actor. Reads take `&self` and observe a consistent
//! snapshot. Administrator-facing operations take the [`Identity`]
//! collaborator and a token; player-facing operations authenticate by
//! player ID alone.

use std::collections::HashMap;
use std::time::Duration;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    chat,
    constants,
    error::Result,
    identity::{Identity, UserId},
    player,
    quiz::{
        self, Quiz, QuizConfig, QuizId, QuizInfo,
        question::{AnswerId, QuestionConfig, QuestionId, QuestionView},
    },
    results::{FinalResults, QuestionResult},
    session::{Action, AlarmMessage, PlayerStatus, Session, Status},
    session_id::SessionId,
};

/// Errors that can occur in store-level lookups and preconditions
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The quiz ID does not refer to a live quiz
    #[error("quiz does not exist")]
    UnknownQuiz,
    /// The quiz ID does not refer to a quiz in the caller's trash
    #[error("quiz is not in the trash")]
    NotInTrash,
    /// The session ID does not refer to a session of this quiz
    #[error("session does not exist for this quiz")]
    UnknownSession,
    /// The player ID does not refer to a joined player
    #[error("player does not exist")]
    UnknownPlayer,
    /// The authenticated user does not own the quiz
    #[error("user does not own this quiz")]
    NotOwner,
    /// The quiz has no questions to play
    #[error("quiz has no questions")]
    EmptyQuiz,
    /// The quiz already has the maximum number of active sessions
    #[error("quiz already has the maximum number of active sessions")]
    ActiveSessionLimit,
    /// The auto-start threshold is above the permitted maximum
    #[error("auto-start threshold exceeds the permitted maximum")]
    AutoStartTooLarge,
    /// The quiz still has sessions that have not ended
    #[error("quiz has active sessions")]
    ActiveSessionsExist,
}

/// Session IDs of a quiz split by liveness
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionLists {
    /// Sessions not yet ended, ascending by ID
    pub active: Vec<SessionId>,
    /// Ended sessions, ascending by ID
    pub inactive: Vec<SessionId>,
}

/// Serialization helper for Store struct
#[derive(Deserialize)]
struct StoreSerde {
    quizzes: HashMap<QuizId, Quiz>,
    trash: HashMap<QuizId, Quiz>,
    sessions: HashMap<SessionId, Session>,
}

/// The single owner of all engine state
#[derive(Default, Serialize, Deserialize)]
#[serde(from = "StoreSerde")]
pub struct Store {
    /// Live quizzes by ID
    quizzes: HashMap<QuizId, Quiz>,
    /// Soft-deleted quizzes by ID, restorable by their owner
    trash: HashMap<QuizId, Quiz>,
    /// Every session ever started, ended ones included
    sessions: HashMap<SessionId, Session>,

    /// Player to session lookup (not serialized)
    #[serde(skip_serializing)]
    player_index: HashMap<player::Id, SessionId>,
}

impl From<StoreSerde> for Store {
    /// Reconstructs the Store from serialized data
    ///
    /// This rebuilds the player index from the sessions' registries, which
    /// is necessary since the index is not serialized.
    fn from(serde: StoreSerde) -> Self {
        let StoreSerde {
            quizzes,
            trash,
            sessions,
        } = serde;
        let mut player_index = HashMap::new();
        for (session_id, session) in &sessions {
            for id in session.players().ids() {
                player_index.insert(*id, *session_id);
            }
        }
        Self {
            quizzes,
            trash,
            sessions,
            player_index,
        }
    }
}

impl std::fmt::Debug for Store {
    /// Custom debug implementation that avoids printing all owned state
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("quizzes", &self.quizzes.len())
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // Lookup helpers

    /// Resolves a quiz the authenticated user owns
    fn owned_quiz(&self, user: UserId, quiz_id: QuizId) -> Result<&Quiz> {
        let quiz = self.quizzes.get(&quiz_id).ok_or(Error::UnknownQuiz)?;
        if !quiz.is_owner(user) {
            return Err(Error::NotOwner.into());
        }
        Ok(quiz)
    }

    /// Resolves a quiz the authenticated user owns, mutably
    fn owned_quiz_mut(&mut self, user: UserId, quiz_id: QuizId) -> Result<&mut Quiz> {
        let quiz = self.quizzes.get_mut(&quiz_id).ok_or(Error::UnknownQuiz)?;
        if !quiz.is_owner(user) {
            return Err(Error::NotOwner.into());
        }
        Ok(quiz)
    }

    /// Counts the quiz's sessions that have not ended
    fn active_session_count(&self, quiz_id: QuizId) -> usize {
        self.sessions
            .values()
            .filter(|session| session.quiz_id() == quiz_id && session.is_active())
            .count()
    }

    /// Rejects structural mutation while the quiz has live sessions
    fn ensure_no_active_sessions(&self, quiz_id: QuizId) -> Result<()> {
        if self.active_session_count(quiz_id) > 0 {
            return Err(Error::ActiveSessionsExist.into());
        }
        Ok(())
    }

    /// Checks that `name` is free among the owner's live quizzes
    fn ensure_name_free(&self, user: UserId, name: &str, except: Option<QuizId>) -> Result<()> {
        let clash = self
            .quizzes
            .values()
            .filter(|quiz| quiz.is_owner(user) && Some(quiz.id()) != except)
            .any(|quiz| quiz.name() == name);
        if clash {
            return Err(quiz::Error::NameTaken.into());
        }
        Ok(())
    }

    /// Resolves a session of a quiz the authenticated user owns
    fn owned_session(
        &self,
        user: UserId,
        quiz_id: QuizId,
        session_id: SessionId,
    ) -> Result<&Session> {
        self.owned_quiz(user, quiz_id)?;
        let session = self.sessions.get(&session_id).ok_or(Error::UnknownSession)?;
        if session.quiz_id() != quiz_id {
            return Err(Error::UnknownSession.into());
        }
        Ok(session)
    }

    /// Resolves the session a player belongs to
    fn session_of(&self, player: player::Id) -> Result<&Session> {
        let session_id = self.player_index.get(&player).ok_or(Error::UnknownPlayer)?;
        Ok(self
            .sessions
            .get(session_id)
            .ok_or(Error::UnknownSession)?)
    }

    /// Resolves the session a player belongs to, mutably
    fn session_of_mut(&mut self, player: player::Id) -> Result<&mut Session> {
        let session_id = *self.player_index.get(&player).ok_or(Error::UnknownPlayer)?;
        Ok(self
            .sessions
            .get_mut(&session_id)
            .ok_or(Error::UnknownSession)?)
    }

    // Quiz CRUD

    /// Creates a quiz owned by the authenticated user
    ///
    /// # Errors
    ///
    /// Fails on a bad token, a malformed payload, or a name already used
    /// by another live quiz of the same owner.
    pub fn create_quiz(
        &mut self,
        identity: &impl Identity,
        token: &str,
        config: &QuizConfig,
    ) -> Result<QuizId> {
        let user = identity.resolve_token(token)?;
        let quiz = Quiz::new(user, config)?;
        self.ensure_name_free(user, quiz.name(), None)?;
        let id = quiz.id();
        self.quizzes.insert(id, quiz);
        Ok(id)
    }

    /// Lists the authenticated user's live quizzes, ascending by name
    ///
    /// # Errors
    ///
    /// Fails on a bad token.
    pub fn list_quizzes(&self, identity: &impl Identity, token: &str) -> Result<Vec<QuizInfo>> {
        let user = identity.resolve_token(token)?;
        Ok(self
            .quizzes
            .values()
            .filter(|quiz| quiz.is_owner(user))
            .map(Quiz::info)
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect_vec())
    }

    /// Returns a quiz the authenticated user owns
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz, or foreign ownership.
    pub fn quiz(&self, identity: &impl Identity, token: &str, quiz_id: QuizId) -> Result<&Quiz> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)
    }

    /// Renames a quiz
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz, foreign ownership, a
    /// malformed name, or a name already used by another live quiz of the
    /// owner.
    pub fn update_quiz_name(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        name: &str,
    ) -> Result<()> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)?;
        self.ensure_name_free(user, name, Some(quiz_id))?;
        self.owned_quiz_mut(user, quiz_id)?.rename(name)
    }

    /// Replaces a quiz's description
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz, foreign ownership, or an
    /// oversized description.
    pub fn update_quiz_description(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        description: &str,
    ) -> Result<()> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz_mut(user, quiz_id)?
            .set_description(description)
    }

    /// Soft-deletes a quiz into the trash
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz, foreign ownership, or while
    /// the quiz has sessions that have not ended.
    pub fn remove_quiz(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
    ) -> Result<()> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)?;
        self.ensure_no_active_sessions(quiz_id)?;
        if let Some(quiz) = self.quizzes.remove(&quiz_id) {
            self.trash.insert(quiz_id, quiz);
        }
        Ok(())
    }

    /// Lists the authenticated user's trashed quizzes
    ///
    /// # Errors
    ///
    /// Fails on a bad token.
    pub fn trashed_quizzes(&self, identity: &impl Identity, token: &str) -> Result<Vec<QuizInfo>> {
        let user = identity.resolve_token(token)?;
        Ok(self
            .trash
            .values()
            .filter(|quiz| quiz.is_owner(user))
            .map(Quiz::info)
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect_vec())
    }

    /// Restores a quiz from the trash
    ///
    /// # Errors
    ///
    /// Fails on a bad token, a quiz that is not in the trash, foreign
    /// ownership, or a name now used by a live quiz of the owner.
    pub fn restore_quiz(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
    ) -> Result<()> {
        let user = identity.resolve_token(token)?;
        let quiz = self.trash.get(&quiz_id).ok_or(Error::NotInTrash)?;
        if !quiz.is_owner(user) {
            return Err(Error::NotOwner.into());
        }
        self.ensure_name_free(user, quiz.name(), None)?;
        if let Some(quiz) = self.trash.remove(&quiz_id) {
            self.quizzes.insert(quiz_id, quiz);
        }
        Ok(())
    }

    /// Permanently deletes quizzes from the caller's trash
    ///
    /// Every ID is checked before anything is deleted, so a bad ID leaves
    /// the trash untouched.
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an ID not in the trash, or foreign ownership.
    pub fn empty_trash(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_ids: &[QuizId],
    ) -> Result<()> {
        let user = identity.resolve_token(token)?;
        for quiz_id in quiz_ids {
            let quiz = self.trash.get(quiz_id).ok_or(Error::NotInTrash)?;
            if !quiz.is_owner(user) {
                return Err(Error::NotOwner.into());
            }
        }
        for quiz_id in quiz_ids {
            self.trash.remove(quiz_id);
        }
        Ok(())
    }

    // Question bank

    /// Appends a new question to a quiz
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz, foreign ownership, live
    /// sessions, or an invalid payload.
    pub fn create_question(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        config: &QuestionConfig,
    ) -> Result<QuestionId> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)?;
        self.ensure_no_active_sessions(quiz_id)?;
        self.owned_quiz_mut(user, quiz_id)?.create_question(config)
    }

    /// Replaces the body of a question
    ///
    /// # Errors
    ///
    /// Fails like [`Store::create_question`], or on an unknown question.
    pub fn update_question(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        question_id: QuestionId,
        config: &QuestionConfig,
    ) -> Result<()> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)?;
        self.ensure_no_active_sessions(quiz_id)?;
        self.owned_quiz_mut(user, quiz_id)?
            .update_question(question_id, config)
    }

    /// Deletes a question from a quiz
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz or question, foreign
    /// ownership, or live sessions.
    pub fn delete_question(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        question_id: QuestionId,
    ) -> Result<()> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)?;
        self.ensure_no_active_sessions(quiz_id)?;
        self.owned_quiz_mut(user, quiz_id)?.delete_question(question_id)
    }

    /// Moves a question to a new 0-based position
    ///
    /// # Errors
    ///
    /// Fails like [`Store::delete_question`], or on a bad target position.
    pub fn move_question(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        question_id: QuestionId,
        new_position: usize,
    ) -> Result<()> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)?;
        self.ensure_no_active_sessions(quiz_id)?;
        self.owned_quiz_mut(user, quiz_id)?
            .move_question(question_id, new_position)
    }

    /// Duplicates a question, inserting the copy right after the original
    ///
    /// # Errors
    ///
    /// Fails like [`Store::delete_question`], or when the copy would pass
    /// the quiz duration budget.
    pub fn duplicate_question(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        question_id: QuestionId,
    ) -> Result<QuestionId> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)?;
        self.ensure_no_active_sessions(quiz_id)?;
        self.owned_quiz_mut(user, quiz_id)?
            .duplicate_question(question_id)
    }

    // Session lifecycle

    /// Starts a session of a quiz
    ///
    /// The session snapshots the quiz's questions; later edits to the quiz
    /// never affect it. When `auto_start_num` is non-zero, the session
    /// advances out of the lobby as soon as that many players have joined.
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz, foreign ownership, an empty
    /// quiz, an out-of-range auto-start threshold, or when the quiz already
    /// has the maximum number of active sessions.
    pub fn start_session(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        auto_start_num: usize,
    ) -> Result<SessionId> {
        let user = identity.resolve_token(token)?;
        let quiz = self.owned_quiz(user, quiz_id)?;
        if auto_start_num > constants::session::MAX_AUTO_START_NUM {
            return Err(Error::AutoStartTooLarge.into());
        }
        if quiz.is_empty() {
            return Err(Error::EmptyQuiz.into());
        }
        if self.active_session_count(quiz_id) >= constants::session::MAX_ACTIVE_SESSIONS {
            return Err(Error::ActiveSessionLimit.into());
        }

        // Codes stay unique for the life of the store, ended sessions included
        let session_id = loop {
            let candidate = SessionId::new();
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        let session = {
            let quiz = self.quizzes.get(&quiz_id).ok_or(Error::UnknownQuiz)?;
            Session::new(session_id, quiz, auto_start_num)
        };
        self.sessions.insert(session_id, session);
        log::debug!("started session {session_id} for quiz {quiz_id}");
        Ok(session_id)
    }

    /// Applies an administrator action to a session
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz or session, foreign
    /// ownership, or an action that is illegal in the session's state.
    pub fn session_action<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        session_id: SessionId,
        action: Action,
        schedule: S,
    ) -> Result<()> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)?;
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(Error::UnknownSession)?;
        if session.quiz_id() != quiz_id {
            return Err(Error::UnknownSession.into());
        }
        session.apply(action, schedule)?;
        Ok(())
    }

    /// Returns the status of a session
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz or session, or foreign
    /// ownership.
    pub fn session_status(
        &self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        session_id: SessionId,
    ) -> Result<Status> {
        let user = identity.resolve_token(token)?;
        Ok(self.owned_session(user, quiz_id, session_id)?.status())
    }

    /// Lists a quiz's sessions split into active and ended
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz, or foreign ownership.
    pub fn quiz_sessions(
        &self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
    ) -> Result<SessionLists> {
        let user = identity.resolve_token(token)?;
        self.owned_quiz(user, quiz_id)?;
        let (active, inactive): (Vec<_>, Vec<_>) = self
            .sessions
            .values()
            .filter(|session| session.quiz_id() == quiz_id)
            .partition(|session| session.is_active());
        Ok(SessionLists {
            active: active.into_iter().map(Session::id).sorted().collect_vec(),
            inactive: inactive.into_iter().map(Session::id).sorted().collect_vec(),
        })
    }

    /// Returns the final results of a session for its administrator
    ///
    /// # Errors
    ///
    /// Fails on a bad token, an unknown quiz or session, foreign
    /// ownership, or before the session reaches its final results.
    pub fn session_final_results(
        &self,
        identity: &impl Identity,
        token: &str,
        quiz_id: QuizId,
        session_id: SessionId,
    ) -> Result<FinalResults> {
        let user = identity.resolve_token(token)?;
        let session = self.owned_session(user, quiz_id, session_id)?;
        Ok(session.final_results()?.clone())
    }

    // Player operations

    /// Joins a player to a session's lobby
    ///
    /// An empty name gets a generated fallback that never collides within
    /// the session.
    ///
    /// # Returns
    ///
    /// The new player's ID and assigned name.
    ///
    /// # Errors
    ///
    /// Fails on an unknown session, outside the lobby, or on a name that
    /// is taken or too long.
    pub fn join_player<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        session_id: SessionId,
        name: &str,
        schedule: S,
    ) -> Result<(player::Id, String)> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(Error::UnknownSession)?;
        let (id, assigned) = session.join(name, schedule)?;
        self.player_index.insert(id, session_id);
        Ok((id, assigned))
    }

    /// Returns the player-facing status of the player's session
    ///
    /// # Errors
    ///
    /// Fails on an unknown player.
    pub fn player_status(&self, player: player::Id) -> Result<PlayerStatus> {
        Ok(self.session_of(player)?.player_status())
    }

    /// Returns the current question as the player sees it
    ///
    /// # Errors
    ///
    /// Fails on an unknown player, outside question states, or a position
    /// that is not the current question.
    pub fn player_question(&self, player: player::Id, position: usize) -> Result<QuestionView> {
        Ok(self.session_of(player)?.question_view(position)?)
    }

    /// Records a player's answer submission
    ///
    /// # Errors
    ///
    /// Fails on an unknown player, a position that is not the current
    /// question, a closed answer window, or malformed answer ids.
    pub fn submit_answer(
        &mut self,
        player: player::Id,
        position: usize,
        answer_ids: &[AnswerId],
    ) -> Result<()> {
        self.session_of_mut(player)?
            .submit_answer(player, position, answer_ids)?;
        Ok(())
    }

    /// Returns the results of one question of the player's session
    ///
    /// # Errors
    ///
    /// Fails on an unknown player, before the answers are shown, or for a
    /// position that was never played.
    pub fn question_results(&self, player: player::Id, position: usize) -> Result<QuestionResult> {
        Ok(self.session_of(player)?.question_results(position)?)
    }

    /// Returns the final results of the player's session
    ///
    /// # Errors
    ///
    /// Fails on an unknown player or before the session reaches its final
    /// results.
    pub fn player_final_results(&self, player: player::Id) -> Result<FinalResults> {
        Ok(self.session_of(player)?.final_results()?.clone())
    }

    /// Appends a chat message to the player's session
    ///
    /// # Errors
    ///
    /// Fails on an unknown player or an out-of-bounds message body.
    pub fn chat_send(&mut self, player: player::Id, body: &str) -> Result<()> {
        self.session_of_mut(player)?.chat_send(player, body)
    }

    /// Returns the chat log of the player's session
    ///
    /// # Errors
    ///
    /// Fails on an unknown player.
    pub fn chat_view(&self, player: player::Id) -> Result<&[chat::Message]> {
        Ok(self.session_of(player)?.chat_messages())
    }

    // Timers and reset

    /// Routes a fired timer to its session
    ///
    /// Alarms for sessions that no longer exist (after [`Store::clear`])
    /// and alarms whose generation went stale are dropped; timer delivery
    /// can never surface an error.
    pub fn receive_alarm<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        alarm: &AlarmMessage,
        schedule: S,
    ) {
        let AlarmMessage::Advance { session, .. } = alarm;
        match self.sessions.get_mut(session) {
            Some(found) => found.receive_alarm(alarm, schedule),
            None => log::warn!("dropping alarm for unknown session {session}"),
        }
    }

    /// Discards all quizzes, sessions, and players
    ///
    /// Dropping the sessions retires every timer generation, so an alarm
    /// the host runtime still has queued will no-op on delivery instead of
    /// mutating the fresh store.
    pub fn clear(&mut self) {
        self.quizzes.clear();
        self.trash.clear();
        self.sessions.clear();
        self.player_index.clear();
        log::debug!("store cleared");
    }
}
