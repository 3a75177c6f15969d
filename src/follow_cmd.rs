//! `proom follow`: the follow-request lifecycle from the command line.

use anyhow::Result;
use practice_room_core::follow::FollowGraph;
use practice_room_core::models::{EdgeId, ProfileSummary, UserId};

use crate::backend::open_backend;
use crate::config::Config;

async fn graph(config: &Config) -> Result<FollowGraph> {
    Ok(FollowGraph::new(open_backend(config).await?))
}

pub async fn run_request(config: &Config, follower: &str, followee: &str) -> Result<()> {
    let edge = graph(config)
        .await?
        .send_request(&UserId::new(follower), &UserId::new(followee))
        .await?;
    println!("Request sent: {} ({})", edge.id, edge.status);
    Ok(())
}

pub async fn run_accept(config: &Config, edge_id: &str) -> Result<()> {
    let edge = graph(config)
        .await?
        .accept_request(&EdgeId::new(edge_id))
        .await?;
    println!(
        "Accepted: {} now follows {}",
        edge.follower_id, edge.followee_id
    );
    Ok(())
}

pub async fn run_reject(config: &Config, edge_id: &str) -> Result<()> {
    graph(config)
        .await?
        .reject_request(&EdgeId::new(edge_id))
        .await?;
    println!("Rejected: {}", edge_id);
    Ok(())
}

pub async fn run_cancel(config: &Config, follower: &str, followee: &str) -> Result<()> {
    graph(config)
        .await?
        .cancel_request(&UserId::new(follower), &UserId::new(followee))
        .await?;
    println!("Cancelled request from {} to {}", follower, followee);
    Ok(())
}

pub async fn run_unfollow(config: &Config, follower: &str, followee: &str) -> Result<()> {
    graph(config)
        .await?
        .unfollow(&UserId::new(follower), &UserId::new(followee))
        .await?;
    println!("{} unfollowed {}", follower, followee);
    Ok(())
}

pub async fn run_status(config: &Config, follower: &str, followee: &str) -> Result<()> {
    let status = graph(config)
        .await?
        .get_status(&UserId::new(follower), &UserId::new(followee))
        .await?;
    match status {
        Some(status) => println!("{}", status),
        None => println!("none"),
    }
    Ok(())
}

pub async fn run_counts(config: &Config, user: &str) -> Result<()> {
    let counts = graph(config).await?.load_counts(&UserId::new(user)).await?;
    println!("Followers: {}", counts.follower_count);
    println!("Following: {}", counts.following_count);
    Ok(())
}

pub async fn run_pending(config: &Config, user: &str) -> Result<()> {
    let requests = graph(config)
        .await?
        .load_pending_requests_for(&UserId::new(user))
        .await?;
    if requests.is_empty() {
        println!("No pending requests.");
        return Ok(());
    }
    println!("{:<38} {:<24} REQUESTED", "EDGE", "FROM");
    for request in &requests {
        println!(
            "{:<38} {:<24} {}",
            request.edge.id,
            request.requester.display_name,
            request.edge.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub async fn run_followers(config: &Config, user: &str) -> Result<()> {
    let people = graph(config)
        .await?
        .list_followers(&UserId::new(user))
        .await?;
    print_people("followers", &people);
    Ok(())
}

pub async fn run_following(config: &Config, user: &str) -> Result<()> {
    let people = graph(config)
        .await?
        .list_following(&UserId::new(user))
        .await?;
    print_people("following", &people);
    Ok(())
}

fn print_people(label: &str, people: &[ProfileSummary]) {
    if people.is_empty() {
        println!("No {}.", label);
        return;
    }
    for person in people {
        println!("{}  {}", person.id, person.display_name);
    }
}
