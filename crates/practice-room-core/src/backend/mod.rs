//! Data-access abstraction for PracticeRoom.
//!
//! The [`Backend`] trait is the semantic boundary between the client logic
//! ([`FeedPager`](crate::feed::FeedPager),
//! [`FollowGraph`](crate::follow::FollowGraph), comments, search) and
//! wherever the rows actually live: the hosted REST API, a local SQLite
//! database, or the in-memory tables in [`memory`].
//!
//! Every call is its own atomic unit from the client's point of view. There
//! are no transactions spanning calls, so multi-step flows such as "check
//! for a duplicate, then insert" are best-effort on the client and must be
//! backed by a uniqueness constraint on the backend side.
//!
//! Implementations must be `Send + Sync` to be shared across tasks.

pub mod memory;

use async_trait::async_trait;

use crate::comments::NewComment;
use crate::error::Result;
use crate::models::{
    Comment, CommentWithAuthor, EdgeFilter, EdgeId, FollowDirection, FollowEdge, FollowStatus,
    NewVideo, PendingRequest, Profile, UserId, VideoId, VideoItem,
};

/// Abstract data service behind the client.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`fetch_global_page`](Backend::fetch_global_page) | Page of every video, newest first |
/// | [`fetch_following_page`](Backend::fetch_following_page) | Page restricted to a set of owners |
/// | [`fetch_user_page`](Backend::fetch_user_page) | Page of one owner's videos |
/// | [`insert_follow_edge`](Backend::insert_follow_edge) | Create an edge (unique per pair) |
/// | [`get_follow_edge`](Backend::get_follow_edge) | Edge by id |
/// | [`update_follow_edge_status`](Backend::update_follow_edge_status) | Change an edge's status |
/// | [`delete_follow_edges`](Backend::delete_follow_edges) | Delete by id or pair + status |
/// | [`query_follow_edge`](Backend::query_follow_edge) | Edge for an ordered pair |
/// | [`count_follow_edges`](Backend::count_follow_edges) | Count edges around a user |
/// | [`list_follow_edges`](Backend::list_follow_edges) | Edges around a user |
/// | [`list_pending_requests`](Backend::list_pending_requests) | Incoming requests with requester profiles |
#[async_trait]
pub trait Backend: Send + Sync {
    /// Videos from every user, newest first.
    async fn fetch_global_page(&self, limit: usize, offset: usize) -> Result<Vec<VideoItem>>;

    /// Videos owned by any of `owners`, newest first.
    async fn fetch_following_page(
        &self,
        owners: &[UserId],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoItem>>;

    /// Videos owned by one user, newest first.
    async fn fetch_user_page(
        &self,
        owner: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoItem>>;

    async fn insert_video(&self, video: &NewVideo) -> Result<VideoItem>;

    /// Returns `false` when no such video existed.
    async fn delete_video(&self, id: &VideoId) -> Result<bool>;

    /// Creates an edge. Fails with
    /// [`Error::DuplicateRequest`](crate::Error::DuplicateRequest) when a
    /// non-rejected edge already exists for the pair.
    async fn insert_follow_edge(
        &self,
        follower: &UserId,
        followee: &UserId,
        status: FollowStatus,
    ) -> Result<FollowEdge>;

    async fn get_follow_edge(&self, id: &EdgeId) -> Result<Option<FollowEdge>>;

    /// Fails with [`Error::NotFound`](crate::Error::NotFound) for a missing edge.
    async fn update_follow_edge_status(&self, id: &EdgeId, status: FollowStatus) -> Result<()>;

    /// Returns the number of edges removed.
    async fn delete_follow_edges(&self, filter: &EdgeFilter) -> Result<u64>;

    async fn query_follow_edge(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<Option<FollowEdge>>;

    async fn count_follow_edges(
        &self,
        user: &UserId,
        direction: FollowDirection,
        status: FollowStatus,
    ) -> Result<u64>;

    /// Edges around `user` with the given status, newest first.
    async fn list_follow_edges(
        &self,
        user: &UserId,
        direction: FollowDirection,
        status: FollowStatus,
    ) -> Result<Vec<FollowEdge>>;

    /// Pending edges targeting `followee`, newest first, each joined with
    /// the requester's profile summary.
    async fn list_pending_requests(&self, followee: &UserId) -> Result<Vec<PendingRequest>>;

    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    /// Case-insensitive substring match on username, excluding `exclude`.
    async fn search_profiles(
        &self,
        pattern: &str,
        exclude: &UserId,
        limit: usize,
    ) -> Result<Vec<Profile>>;

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment>;

    /// Comments on a video, newest first, with author summaries.
    async fn list_comments(&self, video: &VideoId) -> Result<Vec<CommentWithAuthor>>;
}
