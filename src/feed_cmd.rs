//! `proom feed`: open a feed, scroll it, print the window.
//!
//! Loads the first page, then calls `load_more` up to `--more` times (stopping
//! early once the feed is exhausted) and prints what the viewer would have on
//! screen at that point.

use anyhow::Result;
use practice_room_core::feed::{FeedMode, FeedPager, FeedSnapshot};
use practice_room_core::follow::FollowGraph;
use practice_room_core::models::UserId;

use crate::backend::open_backend;
use crate::config::Config;

pub async fn run_global_feed(config: &Config, more: usize, json: bool) -> Result<()> {
    run_feed(config, None, more, json).await
}

/// Feed of the videos posted by accounts `viewer` follows (accepted only).
pub async fn run_following_feed(
    config: &Config,
    viewer: &str,
    more: usize,
    json: bool,
) -> Result<()> {
    run_feed(config, Some(UserId::new(viewer)), more, json).await
}

async fn run_feed(config: &Config, viewer: Option<UserId>, more: usize, json: bool) -> Result<()> {
    let backend = open_backend(config).await?;

    let mode = match viewer {
        Some(viewer) => {
            let graph = FollowGraph::new(backend.clone());
            FeedMode::Following(graph.accepted_followee_ids(&viewer).await?)
        }
        None => FeedMode::Global,
    };

    let pager = FeedPager::new(backend, config.feed.settings())?;
    let mut snapshot = pager.load_initial(mode).await?;
    for _ in 0..more {
        if snapshot.exhausted {
            break;
        }
        snapshot = pager.load_more().await?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

fn print_snapshot(snapshot: &FeedSnapshot) {
    let mode = snapshot.mode.as_ref().map(FeedMode::name).unwrap_or("none");
    println!(
        "Feed ({}): {} videos, cursor {}{}",
        mode,
        snapshot.items.len(),
        snapshot.cursor_offset,
        if snapshot.exhausted { ", exhausted" } else { "" }
    );
    if snapshot.items.is_empty() {
        println!("  (no videos)");
        return;
    }
    for video in &snapshot.items {
        println!(
            "  {}  {}  {}  by {}",
            video.created_at.format("%Y-%m-%d %H:%M"),
            video.id,
            video.title,
            video.user_id
        );
    }
}
