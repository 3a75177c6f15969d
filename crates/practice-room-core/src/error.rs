//! Error taxonomy shared by the core engines and every backend.
//!
//! Backends translate their native failures (`sqlx::Error`,
//! `reqwest::Error`, HTTP status codes) into these variants so the feed and
//! follow logic can react to them without knowing where data lives.

use thiserror::Error;

use crate::models::{FollowStatus, UserId};

#[derive(Debug, Error)]
pub enum Error {
    /// Backend unreachable, non-2xx response, or an undecodable payload.
    #[error("backend transport error: {0}")]
    Transport(String),

    /// A pending or accepted edge already exists for this ordered pair.
    #[error("a follow request from {follower} to {followee} already exists")]
    DuplicateRequest { follower: UserId, followee: UserId },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    /// The edge's current status does not allow the requested action.
    #[error("cannot {action} a follow edge that is {status}")]
    InvalidTransition {
        status: FollowStatus,
        action: &'static str,
    },
}

impl Error {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Error::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
