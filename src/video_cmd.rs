//! `proom video`: manage practice-video metadata.

use anyhow::{bail, Result};
use practice_room_core::models::{NewVideo, UserId, VideoId};

use crate::backend::open_backend;
use crate::config::Config;

pub async fn run_video_add(
    config: &Config,
    owner: &str,
    title: &str,
    url: &str,
    description: Option<String>,
) -> Result<()> {
    if title.trim().is_empty() {
        bail!("video title must not be empty");
    }
    let backend = open_backend(config).await?;
    let video = backend
        .insert_video(&NewVideo::new(title.trim(), description, url, UserId::new(owner)))
        .await?;
    println!("Video added: {}", video.id);
    Ok(())
}

pub async fn run_video_remove(config: &Config, id: &str) -> Result<()> {
    let backend = open_backend(config).await?;
    if !backend.delete_video(&VideoId::new(id)).await? {
        bail!("video not found: {}", id);
    }
    println!("Video removed: {}", id);
    Ok(())
}

/// Lists one owner's videos, newest first.
pub async fn run_video_list(
    config: &Config,
    owner: &str,
    limit: usize,
    offset: usize,
) -> Result<()> {
    let backend = open_backend(config).await?;
    let videos = backend
        .fetch_user_page(&UserId::new(owner), limit, offset)
        .await?;
    if videos.is_empty() {
        println!("No videos.");
        return Ok(());
    }
    for video in &videos {
        println!(
            "{}  {}  {}",
            video.created_at.format("%Y-%m-%d %H:%M"),
            video.id,
            video.title
        );
    }
    Ok(())
}
