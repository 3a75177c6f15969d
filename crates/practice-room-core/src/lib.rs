//! # PracticeRoom Core
//!
//! Client-side logic for PracticeRoom: data models, the typed error
//! taxonomy, the [`Backend`](backend::Backend) abstraction, the windowed
//! feed pager and the follow-request state machine.
//!
//! This crate contains no tokio, sqlx, reqwest or filesystem I/O. Concrete
//! backends (SQLite, the hosted REST API) live in the `practice-room` app
//! crate; [`backend::memory::InMemoryBackend`] ships here for tests and
//! embedding.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Identifiers, videos, follow edges, profiles, comments |
//! | [`error`] | `Error` taxonomy shared by every backend |
//! | [`backend`] | `Backend` trait and the in-memory implementation |
//! | [`feed`] | `FeedPager`: bounded, deduplicated infinite scroll |
//! | [`follow`] | `FollowGraph`: request/accept/reject/cancel/unfollow |
//! | [`comments`] | Structured feedback comments |
//! | [`search`] | Username search |

pub mod backend;
pub mod comments;
pub mod error;
pub mod feed;
pub mod follow;
pub mod models;
pub mod search;

pub use error::{Error, Result};
