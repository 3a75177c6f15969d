//! # PracticeRoom
//!
//! Client logic for PracticeRoom, a social network where musicians share
//! practice videos and give each other structured feedback.
//!
//! The engines live in [`practice_room_core`] (re-exported here): the
//! sliding-window [`FeedPager`](practice_room_core::feed::FeedPager), the
//! follow-request state machine
//! [`FollowGraph`](practice_room_core::follow::FollowGraph), comment threads
//! and user search, all written against the
//! [`Backend`](practice_room_core::backend::Backend) trait. This crate adds the concrete
//! backends, configuration, logging and the `proom` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────┐   ┌──────────────────┐
//! │  proom CLI   │──▶│ practice-room-core     │──▶│ Backend trait    │
//! │ (commands)   │   │ FeedPager, FollowGraph │   │ SQLite │ REST    │
//! └──────────────┘   └───────────────────────┘   └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | `tracing-subscriber` setup |
//! | [`db`] | SQLite connection pool |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_backend`] | `Backend` over SQLite |
//! | [`rest_backend`] | `Backend` over the hosted PostgREST API |
//! | [`backend`] | Opens the configured backend |
//! | [`feed_cmd`] | `proom feed` |
//! | [`follow_cmd`] | `proom follow` |
//! | [`profile_cmd`] | `proom profile`, `proom search` |
//! | [`video_cmd`] | `proom video` |
//! | [`comment_cmd`] | `proom comment` |
//! | [`stats`] | `proom stats` |

pub use practice_room_core;

pub mod backend;
pub mod comment_cmd;
pub mod config;
pub mod db;
pub mod feed_cmd;
pub mod follow_cmd;
pub mod logging;
pub mod migrate;
pub mod profile_cmd;
pub mod rest_backend;
pub mod sqlite_backend;
pub mod stats;
pub mod video_cmd;
