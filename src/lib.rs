//! # Quizhost Engine Library
//!
//! This library provides the core engine for a live quiz-hosting backend.
//! Administrators author quizzes and start sessions; players join a session
//! with a short code, answer timed multiple-choice questions, and view
//! aggregated results once the host reveals them.
//!
//! The crate is sans-io: it never spawns timers or sockets itself. Every
//! operation that arms a question timer takes a `schedule` closure, and the
//! host runtime delivers fired alarms back through
//! [`store::Store::receive_alarm`]. The HTTP layer, authentication and disk
//! persistence are external collaborators; they call the operation surface
//! on [`store::Store`] and translate [`error::Rejection`] into status codes.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

pub mod chat;
pub mod constants;
pub mod error;
pub mod identity;
pub mod names;
pub mod player;
pub mod quiz;
pub mod results;
pub mod session;
pub mod session_id;
pub mod store;

pub use error::{Error, Rejection, Result};
pub use store::Store;
