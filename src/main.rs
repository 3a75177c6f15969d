//! # PracticeRoom CLI (`proom`)
//!
//! Drives the feed, the follow graph, comments and search against the
//! configured backend (a local SQLite database or the hosted REST API).
//!
//! ## Usage
//!
//! ```bash
//! proom --config ./config/proom.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `proom init` | Create the SQLite schema |
//! | `proom stats` | Row counts per table |
//! | `proom profile set/show` | Upsert or show a profile |
//! | `proom video add/remove/list` | Manage video metadata |
//! | `proom feed global/following` | Open a feed and scroll it |
//! | `proom follow <action>` | Follow-request lifecycle |
//! | `proom comment add/list` | Structured feedback on a video |
//! | `proom search <query>` | Find users by username |
//!
//! ## Examples
//!
//! ```bash
//! proom init
//! proom profile set 7d0c... --username clara --instrument piano
//! proom follow request <me> <them>
//! proom follow pending <them>
//! proom follow accept <edge-id>
//! proom feed following --viewer <me> --more 2
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use practice_room::practice_room_core::search::DEFAULT_SEARCH_LIMIT;
use practice_room::profile_cmd::ProfileUpdate;
use practice_room::{
    comment_cmd, config, feed_cmd, follow_cmd, logging, migrate, profile_cmd, stats, video_cmd,
};

/// PracticeRoom CLI: feeds, follow requests and feedback for practice videos.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/proom.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "proom",
    about = "PracticeRoom: feeds, follow requests and feedback for practice videos",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/proom.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the local database schema. Safe to run repeatedly.
    Init,

    /// Show row counts for the local database.
    Stats,

    /// Create, update or show a profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Manage practice-video metadata.
    Video {
        #[command(subcommand)]
        action: VideoAction,
    },

    /// Open a feed, optionally scroll it, and print the visible window.
    Feed {
        #[command(subcommand)]
        action: FeedAction,
    },

    /// Follow requests, follower lists and counts.
    Follow {
        #[command(subcommand)]
        action: FollowAction,
    },

    /// Structured feedback on a video.
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },

    /// Search users by username (case-insensitive substring).
    Search {
        query: String,

        /// The searching user; never included in the results.
        #[arg(long)]
        viewer: String,

        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Create or update a profile. Omitted fields keep their stored value.
    Set {
        id: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        instrument: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    Show {
        id: String,
    },
}

#[derive(Subcommand)]
enum VideoAction {
    /// Register an uploaded video.
    Add {
        /// Owner's user id.
        #[arg(long)]
        owner: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        description: Option<String>,
    },
    Remove {
        id: String,
    },
    /// One user's videos, newest first.
    List {
        owner: String,
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
}

#[derive(Subcommand)]
enum FeedAction {
    /// Videos from every user.
    Global {
        /// Number of `load_more` calls after the first page.
        #[arg(long, default_value = "0")]
        more: usize,
        /// Print the feed snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Videos from accounts the viewer follows.
    Following {
        #[arg(long)]
        viewer: String,
        #[arg(long, default_value = "0")]
        more: usize,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FollowAction {
    /// Send a follow request.
    Request { follower: String, followee: String },
    /// Accept a pending request by edge id.
    Accept { edge_id: String },
    /// Reject (delete) a pending request by edge id.
    Reject { edge_id: String },
    /// Withdraw your own pending request.
    Cancel { follower: String, followee: String },
    /// Remove an accepted follow.
    Unfollow { follower: String, followee: String },
    /// Print the edge status for an ordered pair.
    Status { follower: String, followee: String },
    /// Follower and following counts.
    Counts { user: String },
    /// Incoming pending requests.
    Pending { user: String },
    Followers { user: String },
    Following { user: String },
}

#[derive(Subcommand)]
enum CommentAction {
    Add {
        video: String,
        #[arg(long)]
        author: String,
        /// What went well (required).
        #[arg(long)]
        good: String,
        /// What could improve.
        #[arg(long)]
        improve: Option<String>,
    },
    List {
        video: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging)?;

    match cli.command {
        Commands::Init => {
            if cfg.backend.kind != config::BackendKind::Sqlite {
                anyhow::bail!("init only applies to the sqlite backend");
            }
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Profile { action } => match action {
            ProfileAction::Set {
                id,
                username,
                full_name,
                instrument,
                avatar_url,
            } => {
                let update = ProfileUpdate {
                    username,
                    full_name,
                    instrument,
                    avatar_url,
                };
                profile_cmd::run_profile_set(&cfg, &id, update).await?;
            }
            ProfileAction::Show { id } => {
                profile_cmd::run_profile_show(&cfg, &id).await?;
            }
        },
        Commands::Video { action } => match action {
            VideoAction::Add {
                owner,
                title,
                url,
                description,
            } => {
                video_cmd::run_video_add(&cfg, &owner, &title, &url, description).await?;
            }
            VideoAction::Remove { id } => {
                video_cmd::run_video_remove(&cfg, &id).await?;
            }
            VideoAction::List {
                owner,
                limit,
                offset,
            } => {
                video_cmd::run_video_list(&cfg, &owner, limit, offset).await?;
            }
        },
        Commands::Feed { action } => match action {
            FeedAction::Global { more, json } => {
                feed_cmd::run_global_feed(&cfg, more, json).await?;
            }
            FeedAction::Following { viewer, more, json } => {
                feed_cmd::run_following_feed(&cfg, &viewer, more, json).await?;
            }
        },
        Commands::Follow { action } => match action {
            FollowAction::Request { follower, followee } => {
                follow_cmd::run_request(&cfg, &follower, &followee).await?;
            }
            FollowAction::Accept { edge_id } => {
                follow_cmd::run_accept(&cfg, &edge_id).await?;
            }
            FollowAction::Reject { edge_id } => {
                follow_cmd::run_reject(&cfg, &edge_id).await?;
            }
            FollowAction::Cancel { follower, followee } => {
                follow_cmd::run_cancel(&cfg, &follower, &followee).await?;
            }
            FollowAction::Unfollow { follower, followee } => {
                follow_cmd::run_unfollow(&cfg, &follower, &followee).await?;
            }
            FollowAction::Status { follower, followee } => {
                follow_cmd::run_status(&cfg, &follower, &followee).await?;
            }
            FollowAction::Counts { user } => {
                follow_cmd::run_counts(&cfg, &user).await?;
            }
            FollowAction::Pending { user } => {
                follow_cmd::run_pending(&cfg, &user).await?;
            }
            FollowAction::Followers { user } => {
                follow_cmd::run_followers(&cfg, &user).await?;
            }
            FollowAction::Following { user } => {
                follow_cmd::run_following(&cfg, &user).await?;
            }
        },
        Commands::Comment { action } => match action {
            CommentAction::Add {
                video,
                author,
                good,
                improve,
            } => {
                comment_cmd::run_comment_add(&cfg, &video, &author, &good, improve.as_deref())
                    .await?;
            }
            CommentAction::List { video } => {
                comment_cmd::run_comment_list(&cfg, &video).await?;
            }
        },
        Commands::Search {
            query,
            viewer,
            limit,
        } => {
            profile_cmd::run_search(&cfg, &query, &viewer, limit).await?;
        }
    }

    Ok(())
}
