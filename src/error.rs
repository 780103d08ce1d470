//! Crate-level error aggregation and boundary classification
//!
//! Every component reports failures through its own small error enum. This
//! module folds them into one [`Error`] type and classifies each failure
//! into the [`Rejection`] taxonomy the HTTP collaborator maps onto status
//! codes. Validation and state conflicts surface immediately to the caller;
//! nothing is retried and no partial mutation is left behind.

use serde::Serialize;
use thiserror::Error;

use crate::{chat, identity, names, quiz, session, store};

/// Boundary classification of a failed operation
///
/// The HTTP collaborator translates these into status codes (bad request,
/// unauthorized, forbidden). The engine itself never inspects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, derive_more::Display)]
pub enum Rejection {
    /// Malformed input, an illegal state transition, or an unknown
    /// quiz/session/question/player id
    #[display("bad request")]
    BadRequest,
    /// Empty or unknown session token
    #[display("unauthorized")]
    Unauthorized,
    /// Valid user, but the quiz belongs to someone else
    #[display("forbidden")]
    Forbidden,
}

/// Any failure produced by an engine operation
#[derive(Error, Debug)]
pub enum Error {
    /// Token resolution failed
    #[error(transparent)]
    Auth(#[from] identity::Error),
    /// Quiz metadata or question-bank bookkeeping failed
    #[error(transparent)]
    Quiz(#[from] quiz::Error),
    /// A question payload broke a cross-field rule
    #[error(transparent)]
    Question(#[from] quiz::question::Error),
    /// A player name was rejected
    #[error(transparent)]
    Name(#[from] names::Error),
    /// A chat message was rejected
    #[error(transparent)]
    Chat(#[from] chat::Error),
    /// A session action, submission, or results query was rejected
    #[error(transparent)]
    Session(#[from] session::Error),
    /// A store-level lookup or precondition failed
    #[error(transparent)]
    Store(#[from] store::Error),
    /// A payload failed field validation
    #[error("invalid input: {0}")]
    Invalid(garde::Report),
}

impl From<garde::Report> for Error {
    /// Wraps a field validation report
    fn from(report: garde::Report) -> Self {
        Self::Invalid(report)
    }
}

impl Error {
    /// Classifies this failure for the transport boundary
    ///
    /// Authentication failures are [`Rejection::Unauthorized`], ownership
    /// failures are [`Rejection::Forbidden`], and everything else
    /// (validation, state conflicts, unknown ids) is
    /// [`Rejection::BadRequest`].
    pub fn rejection(&self) -> Rejection {
        match self {
            Self::Auth(_) => Rejection::Unauthorized,
            Self::Store(store::Error::NotOwner) => Rejection::Forbidden,
            _ => Rejection::BadRequest,
        }
    }
}

/// Convenience alias for engine operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_unauthorized() {
        let error = Error::from(identity::Error::InvalidToken);
        assert_eq!(error.rejection(), Rejection::Unauthorized);
    }

    #[test]
    fn test_ownership_errors_are_forbidden() {
        let error = Error::from(store::Error::NotOwner);
        assert_eq!(error.rejection(), Rejection::Forbidden);
    }

    #[test]
    fn test_everything_else_is_bad_request() {
        let cases = [
            Error::from(store::Error::UnknownQuiz),
            Error::from(names::Error::Used),
            Error::from(chat::Error::BodyLength),
            Error::from(quiz::question::Error::NoCorrectAnswer),
            Error::from(session::Error::OutOfQuestions),
        ];
        for error in cases {
            assert_eq!(error.rejection(), Rejection::BadRequest);
        }
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(Rejection::BadRequest.to_string(), "bad request");
        assert_eq!(Rejection::Unauthorized.to_string(), "unauthorized");
        assert_eq!(Rejection::Forbidden.to_string(), "forbidden");
    }
}
