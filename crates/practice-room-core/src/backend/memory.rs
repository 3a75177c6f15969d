//! In-memory [`Backend`] implementation for tests and embedding.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Pair uniqueness for
//! pending/accepted edges is enforced on insert, the same guarantee the
//! hosted database gives through its unique constraint. A switch makes
//! every call fail with a transport error so callers' failure paths can be
//! exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::comments::NewComment;
use crate::error::{Error, Result};
use crate::models::{
    Comment, CommentId, CommentWithAuthor, EdgeFilter, EdgeId, FollowDirection, FollowEdge,
    FollowStatus, NewVideo, PendingRequest, Profile, ProfileSummary, UserId, VideoId, VideoItem,
};

use super::Backend;

/// In-memory backend for tests and single-process use.
pub struct InMemoryBackend {
    videos: RwLock<Vec<VideoItem>>,
    edges: RwLock<Vec<FollowEdge>>,
    profiles: RwLock<HashMap<UserId, Profile>>,
    comments: RwLock<Vec<Comment>>,
    unavailable: AtomicBool,
    page_fetches: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            videos: RwLock::new(Vec::new()),
            edges: RwLock::new(Vec::new()),
            profiles: RwLock::new(HashMap::new()),
            comments: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
            page_fetches: AtomicUsize::new(0),
        }
    }

    /// Stores a video exactly as given, keeping its timestamps.
    pub fn seed_video(&self, video: VideoItem) -> Result<()> {
        write(&self.videos)?.push(video);
        Ok(())
    }

    pub fn seed_profile(&self, profile: Profile) -> Result<()> {
        write(&self.profiles)?.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// While set, every call fails with [`Error::Transport`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of video page fetches served so far.
    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Transport("backend unavailable".to_string()));
        }
        Ok(())
    }

    fn page_where(
        &self,
        limit: usize,
        offset: usize,
        keep: impl Fn(&VideoItem) -> bool,
    ) -> Result<Vec<VideoItem>> {
        self.check_available()?;
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        let videos = read(&self.videos)?;
        // Later inserts win ties on created_at.
        let mut matching: Vec<&VideoItem> = videos.iter().rev().filter(|v| keep(v)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn summary_of(&self, id: &UserId) -> Result<ProfileSummary> {
        let profiles = read(&self.profiles)?;
        Ok(profiles
            .get(id)
            .map(Profile::summary)
            .unwrap_or_else(|| ProfileSummary::unknown(id.clone())))
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| Error::Transport("in-memory table lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| Error::Transport("in-memory table lock poisoned".to_string()))
}

fn touches(edge: &FollowEdge, user: &UserId, direction: FollowDirection) -> bool {
    match direction {
        FollowDirection::Followers => &edge.followee_id == user,
        FollowDirection::Following => &edge.follower_id == user,
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn fetch_global_page(&self, limit: usize, offset: usize) -> Result<Vec<VideoItem>> {
        self.page_where(limit, offset, |_| true)
    }

    async fn fetch_following_page(
        &self,
        owners: &[UserId],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoItem>> {
        self.page_where(limit, offset, |v| owners.contains(&v.user_id))
    }

    async fn fetch_user_page(
        &self,
        owner: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoItem>> {
        self.page_where(limit, offset, |v| &v.user_id == owner)
    }

    async fn insert_video(&self, video: &NewVideo) -> Result<VideoItem> {
        self.check_available()?;
        let item = VideoItem {
            id: VideoId::generate(),
            title: video.title.clone(),
            description: video.description.clone(),
            video_url: video.video_url.clone(),
            user_id: video.user_id.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        write(&self.videos)?.push(item.clone());
        Ok(item)
    }

    async fn delete_video(&self, id: &VideoId) -> Result<bool> {
        self.check_available()?;
        let mut videos = write(&self.videos)?;
        let before = videos.len();
        videos.retain(|v| &v.id != id);
        let removed = videos.len() != before;
        if removed {
            write(&self.comments)?.retain(|c| &c.video_id != id);
        }
        Ok(removed)
    }

    async fn insert_follow_edge(
        &self,
        follower: &UserId,
        followee: &UserId,
        status: FollowStatus,
    ) -> Result<FollowEdge> {
        self.check_available()?;
        let mut edges = write(&self.edges)?;
        let duplicate = edges.iter().any(|e| {
            &e.follower_id == follower && &e.followee_id == followee && e.status.is_active()
        });
        if duplicate && status.is_active() {
            return Err(Error::DuplicateRequest {
                follower: follower.clone(),
                followee: followee.clone(),
            });
        }
        let edge = FollowEdge {
            id: EdgeId::generate(),
            follower_id: follower.clone(),
            followee_id: followee.clone(),
            status,
            created_at: Utc::now(),
        };
        edges.push(edge.clone());
        Ok(edge)
    }

    async fn get_follow_edge(&self, id: &EdgeId) -> Result<Option<FollowEdge>> {
        self.check_available()?;
        Ok(read(&self.edges)?.iter().find(|e| &e.id == id).cloned())
    }

    async fn update_follow_edge_status(&self, id: &EdgeId, status: FollowStatus) -> Result<()> {
        self.check_available()?;
        let mut edges = write(&self.edges)?;
        match edges.iter_mut().find(|e| &e.id == id) {
            Some(edge) => {
                edge.status = status;
                Ok(())
            }
            None => Err(Error::NotFound(format!("follow edge {}", id))),
        }
    }

    async fn delete_follow_edges(&self, filter: &EdgeFilter) -> Result<u64> {
        self.check_available()?;
        let mut edges = write(&self.edges)?;
        let before = edges.len();
        match filter {
            EdgeFilter::ById(id) => edges.retain(|e| &e.id != id),
            EdgeFilter::Pair {
                follower,
                followee,
                status,
            } => edges.retain(|e| {
                !(&e.follower_id == follower && &e.followee_id == followee && &e.status == status)
            }),
        }
        Ok((before - edges.len()) as u64)
    }

    async fn query_follow_edge(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<Option<FollowEdge>> {
        self.check_available()?;
        let edges = read(&self.edges)?;
        let mut pair: Vec<&FollowEdge> = edges
            .iter()
            .filter(|e| &e.follower_id == follower && &e.followee_id == followee)
            .collect();
        // An active edge shadows any stale rejected row for the same pair.
        pair.sort_by_key(|e| !e.status.is_active());
        Ok(pair.first().map(|e| (*e).clone()))
    }

    async fn count_follow_edges(
        &self,
        user: &UserId,
        direction: FollowDirection,
        status: FollowStatus,
    ) -> Result<u64> {
        self.check_available()?;
        let edges = read(&self.edges)?;
        Ok(edges
            .iter()
            .filter(|e| e.status == status && touches(e, user, direction))
            .count() as u64)
    }

    async fn list_follow_edges(
        &self,
        user: &UserId,
        direction: FollowDirection,
        status: FollowStatus,
    ) -> Result<Vec<FollowEdge>> {
        self.check_available()?;
        let edges = read(&self.edges)?;
        let mut matching: Vec<FollowEdge> = edges
            .iter()
            .rev()
            .filter(|e| e.status == status && touches(e, user, direction))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn list_pending_requests(&self, followee: &UserId) -> Result<Vec<PendingRequest>> {
        let edges = self
            .list_follow_edges(followee, FollowDirection::Followers, FollowStatus::Pending)
            .await?;
        edges
            .into_iter()
            .map(|edge| {
                let requester = self.summary_of(&edge.follower_id)?;
                Ok(PendingRequest { edge, requester })
            })
            .collect()
    }

    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>> {
        self.check_available()?;
        Ok(read(&self.profiles)?.get(id).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.check_available()?;
        write(&self.profiles)?.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn search_profiles(
        &self,
        pattern: &str,
        exclude: &UserId,
        limit: usize,
    ) -> Result<Vec<Profile>> {
        self.check_available()?;
        let needle = pattern.to_lowercase();
        let profiles = read(&self.profiles)?;
        let mut hits: Vec<Profile> = profiles
            .values()
            .filter(|p| &p.id != exclude)
            .filter(|p| {
                p.username
                    .as_deref()
                    .map(|u| u.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.username.cmp(&b.username));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        self.check_available()?;
        let known_video = read(&self.videos)?
            .iter()
            .any(|v| &v.id == comment.video_id());
        if !known_video {
            return Err(Error::NotFound(format!("video {}", comment.video_id())));
        }
        let stored = Comment {
            id: CommentId::generate(),
            video_id: comment.video_id().clone(),
            user_id: comment.author_id().clone(),
            good_thing: comment.good_thing().to_string(),
            improvement: comment.improvement().map(str::to_string),
            created_at: Utc::now(),
        };
        write(&self.comments)?.push(stored.clone());
        Ok(stored)
    }

    async fn list_comments(&self, video: &VideoId) -> Result<Vec<CommentWithAuthor>> {
        self.check_available()?;
        let mut thread: Vec<Comment> = read(&self.comments)?
            .iter()
            .rev()
            .filter(|c| &c.video_id == video)
            .cloned()
            .collect();
        thread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        thread
            .into_iter()
            .map(|comment| {
                let author = self.summary_of(&comment.user_id)?;
                Ok(CommentWithAuthor { comment, author })
            })
            .collect()
    }
}
