//! `proom profile` and `proom search`.

use anyhow::{bail, Result};
use practice_room_core::models::{Profile, UserId};
use practice_room_core::search::search_users;

use crate::backend::open_backend;
use crate::config::Config;

/// Fields accepted by `proom profile set`; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub instrument: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn run_profile_set(config: &Config, id: &str, update: ProfileUpdate) -> Result<()> {
    let backend = open_backend(config).await?;
    let id = UserId::new(id);
    let mut profile = backend
        .get_profile(&id)
        .await?
        .unwrap_or_else(|| Profile::new(id));

    if let Some(username) = update.username {
        profile.username = Some(username);
    }
    if let Some(full_name) = update.full_name {
        profile.full_name = Some(full_name);
    }
    if let Some(instrument) = update.instrument {
        profile.instrument = Some(instrument);
    }
    if let Some(avatar_url) = update.avatar_url {
        profile.avatar_url = Some(avatar_url);
    }

    backend.upsert_profile(&profile).await?;
    println!("Profile saved: {} ({})", profile.id, profile.summary().display_name);
    Ok(())
}

pub async fn run_profile_show(config: &Config, id: &str) -> Result<()> {
    let backend = open_backend(config).await?;
    let profile = match backend.get_profile(&UserId::new(id)).await? {
        Some(profile) => profile,
        None => bail!("profile not found: {}", id),
    };

    println!("id:          {}", profile.id);
    println!("username:    {}", profile.username.as_deref().unwrap_or("-"));
    println!("full name:   {}", profile.full_name.as_deref().unwrap_or("-"));
    println!("instrument:  {}", profile.instrument.as_deref().unwrap_or("-"));
    println!("avatar:      {}", profile.avatar_url.as_deref().unwrap_or("-"));
    Ok(())
}

pub async fn run_search(config: &Config, query: &str, viewer: &str, limit: usize) -> Result<()> {
    let backend = open_backend(config).await?;
    let hits = search_users(backend.as_ref(), query, &UserId::new(viewer), limit).await?;
    if hits.is_empty() {
        println!("No users found.");
        return Ok(());
    }
    for profile in &hits {
        println!(
            "{}  {}  {}",
            profile.id,
            profile.username.as_deref().unwrap_or("-"),
            profile.instrument.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
