//! `proom comment`: structured feedback on a video.

use anyhow::Result;
use practice_room_core::comments::{CommentThread, NewComment};
use practice_room_core::models::{CommentWithAuthor, UserId, VideoId};

use crate::backend::open_backend;
use crate::config::Config;

pub async fn run_comment_add(
    config: &Config,
    video: &str,
    author: &str,
    good_thing: &str,
    improvement: Option<&str>,
) -> Result<()> {
    let video = VideoId::new(video);
    let comment = NewComment::new(video.clone(), UserId::new(author), good_thing, improvement)?;
    let thread = CommentThread::new(open_backend(config).await?, video);
    let comments = thread.add(comment).await?;
    println!("Comment added ({} on this video).", comments.len());
    Ok(())
}

pub async fn run_comment_list(config: &Config, video: &str) -> Result<()> {
    let thread = CommentThread::new(open_backend(config).await?, VideoId::new(video));
    let comments = thread.load().await?;
    if comments.is_empty() {
        println!("No comments.");
        return Ok(());
    }
    for entry in &comments {
        print_comment(entry);
    }
    Ok(())
}

fn print_comment(entry: &CommentWithAuthor) {
    println!(
        "{} ({})",
        entry.author.display_name,
        entry.comment.created_at.format("%Y-%m-%d %H:%M")
    );
    println!("  + {}", entry.comment.good_thing);
    if let Some(improvement) = &entry.comment.improvement {
        println!("  > {}", improvement);
    }
}
