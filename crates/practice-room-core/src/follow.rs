//! Follow requests with pending/accepted semantics.
//!
//! [`FollowGraph`] drives the edge lifecycle against a [`Backend`]:
//!
//! ```text
//!            send_request            accept_request
//!   (none) ───────────────▶ Pending ───────────────▶ Accepted
//!     ▲                        │                        │
//!     └──── reject / cancel ───┘                        │
//!     └──────────────────── unfollow ───────────────────┘
//! ```
//!
//! Rejecting a request deletes the edge; no `Rejected` row is ever
//! written. Duplicate prevention in [`FollowGraph::send_request`] is a
//! read-then-insert and therefore racy against a concurrent sender; the
//! backend's uniqueness constraint on the pair is what actually guarantees
//! at most one pending/accepted edge, and its `DuplicateRequest` is passed
//! through unchanged.
//!
//! Counts are a local cache. They are replaced wholesale by
//! [`FollowGraph::load_counts`]; the only speculative change is the
//! follower-count decrement after a successful [`FollowGraph::unfollow`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::models::{
    EdgeFilter, EdgeId, FollowCounts, FollowDirection, FollowEdge, FollowStatus, PendingRequest,
    ProfileSummary, UserId,
};

pub struct FollowGraph {
    backend: Arc<dyn Backend>,
    counts: Mutex<HashMap<UserId, FollowCounts>>,
}

impl FollowGraph {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Status of the edge from `follower` to `followee`, if any.
    pub async fn get_status(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<Option<FollowStatus>> {
        let edge = self.backend.query_follow_edge(follower, followee).await?;
        Ok(edge.map(|e| e.status))
    }

    /// Creates a pending edge from `follower` to `followee`.
    pub async fn send_request(&self, follower: &UserId, followee: &UserId) -> Result<FollowEdge> {
        if follower == followee {
            return Err(Error::Validation("users cannot follow themselves".to_string()));
        }
        // Advisory only: a concurrent sender can pass this check too.
        if let Some(existing) = self.backend.query_follow_edge(follower, followee).await? {
            if existing.status.is_active() {
                return Err(Error::DuplicateRequest {
                    follower: follower.clone(),
                    followee: followee.clone(),
                });
            }
        }
        let edge = self
            .backend
            .insert_follow_edge(follower, followee, FollowStatus::Pending)
            .await?;
        debug!(edge = %edge.id, %follower, %followee, "follow: request sent");
        Ok(edge)
    }

    /// Moves a pending edge to accepted. Accepting an already accepted
    /// edge succeeds without writing.
    pub async fn accept_request(&self, edge_id: &EdgeId) -> Result<FollowEdge> {
        let mut edge = self.require_edge(edge_id).await?;
        match edge.status {
            FollowStatus::Accepted => {
                debug!(edge = %edge_id, "follow: already accepted");
                Ok(edge)
            }
            FollowStatus::Pending => {
                self.backend
                    .update_follow_edge_status(edge_id, FollowStatus::Accepted)
                    .await?;
                edge.status = FollowStatus::Accepted;
                debug!(edge = %edge_id, "follow: request accepted");
                Ok(edge)
            }
            FollowStatus::Rejected => Err(Error::InvalidTransition {
                status: edge.status,
                action: "accept",
            }),
        }
    }

    /// Deletes a pending edge.
    pub async fn reject_request(&self, edge_id: &EdgeId) -> Result<()> {
        let edge = self.require_edge(edge_id).await?;
        if edge.status == FollowStatus::Accepted {
            return Err(Error::InvalidTransition {
                status: edge.status,
                action: "reject",
            });
        }
        self.backend
            .delete_follow_edges(&EdgeFilter::ById(edge_id.clone()))
            .await?;
        debug!(edge = %edge_id, "follow: request rejected");
        Ok(())
    }

    /// Withdraws a pending request. Never touches an accepted edge.
    pub async fn cancel_request(&self, follower: &UserId, followee: &UserId) -> Result<()> {
        let edge = self.require_pair(follower, followee).await?;
        if edge.status != FollowStatus::Pending {
            return Err(Error::InvalidTransition {
                status: edge.status,
                action: "cancel",
            });
        }
        let removed = self
            .backend
            .delete_follow_edges(&EdgeFilter::Pair {
                follower: follower.clone(),
                followee: followee.clone(),
                status: FollowStatus::Pending,
            })
            .await?;
        if removed == 0 {
            // Accepted or removed between the read and the delete.
            return Err(Error::NotFound(format!(
                "pending follow request from {} to {}",
                follower, followee
            )));
        }
        debug!(%follower, %followee, "follow: request cancelled");
        Ok(())
    }

    /// Removes an accepted edge and optimistically decrements the
    /// followee's cached follower count.
    pub async fn unfollow(&self, follower: &UserId, followee: &UserId) -> Result<()> {
        let edge = self.require_pair(follower, followee).await?;
        if edge.status != FollowStatus::Accepted {
            return Err(Error::InvalidTransition {
                status: edge.status,
                action: "unfollow",
            });
        }
        let removed = self
            .backend
            .delete_follow_edges(&EdgeFilter::Pair {
                follower: follower.clone(),
                followee: followee.clone(),
                status: FollowStatus::Accepted,
            })
            .await?;
        if removed == 0 {
            return Err(Error::NotFound(format!(
                "accepted follow from {} to {}",
                follower, followee
            )));
        }
        self.lock_counts()
            .entry(followee.clone())
            .or_default()
            .decrement_followers();
        debug!(%follower, %followee, "follow: unfollowed");
        Ok(())
    }

    /// Recounts accepted edges in both directions and replaces the cache.
    pub async fn load_counts(&self, user: &UserId) -> Result<FollowCounts> {
        let follower_count = self
            .backend
            .count_follow_edges(user, FollowDirection::Followers, FollowStatus::Accepted)
            .await?;
        let following_count = self
            .backend
            .count_follow_edges(user, FollowDirection::Following, FollowStatus::Accepted)
            .await?;
        let counts = FollowCounts {
            follower_count,
            following_count,
        };
        self.lock_counts().insert(user.clone(), counts);
        Ok(counts)
    }

    /// Last counts known locally; zero for a user never loaded.
    pub fn cached_counts(&self, user: &UserId) -> FollowCounts {
        self.lock_counts().get(user).copied().unwrap_or_default()
    }

    /// Incoming pending requests for `user`, newest first.
    pub async fn load_pending_requests_for(&self, user: &UserId) -> Result<Vec<PendingRequest>> {
        self.backend.list_pending_requests(user).await
    }

    /// Users `user` follows with an accepted edge; the id set behind the
    /// following feed.
    pub async fn accepted_followee_ids(&self, user: &UserId) -> Result<Vec<UserId>> {
        let edges = self
            .backend
            .list_follow_edges(user, FollowDirection::Following, FollowStatus::Accepted)
            .await?;
        Ok(edges.into_iter().map(|e| e.followee_id).collect())
    }

    /// Accepted followers of `user`. A follower without a profile row is
    /// listed as [`ProfileSummary::unknown`].
    pub async fn list_followers(&self, user: &UserId) -> Result<Vec<ProfileSummary>> {
        self.list_connections(user, FollowDirection::Followers).await
    }

    pub async fn list_following(&self, user: &UserId) -> Result<Vec<ProfileSummary>> {
        self.list_connections(user, FollowDirection::Following).await
    }

    async fn list_connections(
        &self,
        user: &UserId,
        direction: FollowDirection,
    ) -> Result<Vec<ProfileSummary>> {
        let edges = self
            .backend
            .list_follow_edges(user, direction, FollowStatus::Accepted)
            .await?;
        let mut summaries = Vec::with_capacity(edges.len());
        for edge in edges {
            let other = match direction {
                FollowDirection::Followers => edge.follower_id,
                FollowDirection::Following => edge.followee_id,
            };
            let summary = match self.backend.get_profile(&other).await? {
                Some(profile) => profile.summary(),
                None => {
                    warn!(user = %other, "follow: connection has no profile");
                    ProfileSummary::unknown(other)
                }
            };
            summaries.push(summary);
        }
        Ok(summaries)
    }

    async fn require_edge(&self, edge_id: &EdgeId) -> Result<FollowEdge> {
        self.backend
            .get_follow_edge(edge_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("follow request {}", edge_id)))
    }

    async fn require_pair(&self, follower: &UserId, followee: &UserId) -> Result<FollowEdge> {
        self.backend
            .query_follow_edge(follower, followee)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("follow edge from {} to {}", follower, followee))
            })
    }

    fn lock_counts(&self) -> MutexGuard<'_, HashMap<UserId, FollowCounts>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use crate::models::Profile;

    fn ids() -> (UserId, UserId) {
        (UserId::new("alice"), UserId::new("bob"))
    }

    fn graph() -> (Arc<InMemoryBackend>, FollowGraph) {
        let backend = Arc::new(InMemoryBackend::new());
        let graph = FollowGraph::new(backend.clone());
        (backend, graph)
    }

    #[tokio::test]
    async fn test_send_request_creates_pending() {
        let (_, graph) = graph();
        let (a, b) = ids();
        assert_eq!(graph.get_status(&a, &b).await.unwrap(), None);
        let edge = graph.send_request(&a, &b).await.unwrap();
        assert_eq!(edge.status, FollowStatus::Pending);
        assert_eq!(
            graph.get_status(&a, &b).await.unwrap(),
            Some(FollowStatus::Pending)
        );
    }

    #[tokio::test]
    async fn test_second_request_is_duplicate() {
        let (_, graph) = graph();
        let (a, b) = ids();
        graph.send_request(&a, &b).await.unwrap();
        let err = graph.send_request(&a, &b).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateRequest { .. }));
    }

    #[tokio::test]
    async fn test_request_after_accept_is_duplicate() {
        let (_, graph) = graph();
        let (a, b) = ids();
        let edge = graph.send_request(&a, &b).await.unwrap();
        graph.accept_request(&edge.id).await.unwrap();
        let err = graph.send_request(&a, &b).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateRequest { .. }));
    }

    #[tokio::test]
    async fn test_self_follow_rejected() {
        let (_, graph) = graph();
        let (a, _) = ids();
        let err = graph.send_request(&a, &a).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_accept_then_unfollow() {
        let (_, graph) = graph();
        let (a, b) = ids();
        let edge = graph.send_request(&a, &b).await.unwrap();
        graph.accept_request(&edge.id).await.unwrap();
        assert_eq!(
            graph.get_status(&a, &b).await.unwrap(),
            Some(FollowStatus::Accepted)
        );

        let counts = graph.load_counts(&b).await.unwrap();
        assert_eq!(counts.follower_count, 1);
        assert_eq!(graph.load_counts(&a).await.unwrap().following_count, 1);

        graph.unfollow(&a, &b).await.unwrap();
        assert_eq!(graph.get_status(&a, &b).await.unwrap(), None);
        assert_eq!(graph.cached_counts(&b).follower_count, 0);
        assert_eq!(graph.load_counts(&b).await.unwrap().follower_count, 0);
    }

    #[tokio::test]
    async fn test_unfollow_decrement_clamps_at_zero() {
        let (_, graph) = graph();
        let (a, b) = ids();
        let edge = graph.send_request(&a, &b).await.unwrap();
        graph.accept_request(&edge.id).await.unwrap();
        // Counts never loaded: the cached value starts at zero.
        graph.unfollow(&a, &b).await.unwrap();
        assert_eq!(graph.cached_counts(&b).follower_count, 0);
    }

    #[tokio::test]
    async fn test_accept_is_idempotent() {
        let (_, graph) = graph();
        let (a, b) = ids();
        let edge = graph.send_request(&a, &b).await.unwrap();
        graph.accept_request(&edge.id).await.unwrap();
        let again = graph.accept_request(&edge.id).await.unwrap();
        assert_eq!(again.status, FollowStatus::Accepted);
    }

    #[tokio::test]
    async fn test_accept_missing_is_not_found() {
        let (_, graph) = graph();
        let err = graph.accept_request(&EdgeId::new("nope")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reject_deletes_edge() {
        let (_, graph) = graph();
        let (a, b) = ids();
        let edge = graph.send_request(&a, &b).await.unwrap();
        graph.reject_request(&edge.id).await.unwrap();
        assert_eq!(graph.get_status(&a, &b).await.unwrap(), None);
        // The requester may ask again after a rejection.
        graph.send_request(&a, &b).await.unwrap();
    }

    #[tokio::test]
    async fn test_reject_accepted_is_invalid() {
        let (_, graph) = graph();
        let (a, b) = ids();
        let edge = graph.send_request(&a, &b).await.unwrap();
        graph.accept_request(&edge.id).await.unwrap();
        let err = graph.reject_request(&edge.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { action: "reject", .. }));
        assert_eq!(
            graph.get_status(&a, &b).await.unwrap(),
            Some(FollowStatus::Accepted)
        );
    }

    #[tokio::test]
    async fn test_cancel_only_pending() {
        let (_, graph) = graph();
        let (a, b) = ids();
        graph.send_request(&a, &b).await.unwrap();
        graph.cancel_request(&a, &b).await.unwrap();
        assert_eq!(graph.get_status(&a, &b).await.unwrap(), None);

        let edge = graph.send_request(&a, &b).await.unwrap();
        graph.accept_request(&edge.id).await.unwrap();
        let err = graph.cancel_request(&a, &b).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(
            graph.get_status(&a, &b).await.unwrap(),
            Some(FollowStatus::Accepted)
        );
    }

    #[tokio::test]
    async fn test_unfollow_pending_is_invalid() {
        let (_, graph) = graph();
        let (a, b) = ids();
        graph.send_request(&a, &b).await.unwrap();
        let err = graph.unfollow(&a, &b).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        let err = graph.unfollow(&b, &a).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_counts_only_accepted() {
        let (_, graph) = graph();
        let b = UserId::new("bob");
        for name in ["c1", "c2", "c3"] {
            let edge = graph.send_request(&UserId::new(name), &b).await.unwrap();
            if name != "c3" {
                graph.accept_request(&edge.id).await.unwrap();
            }
        }
        let counts = graph.load_counts(&b).await.unwrap();
        assert_eq!(counts.follower_count, 2);
        assert_eq!(counts.following_count, 0);
    }

    #[tokio::test]
    async fn test_failures_leave_cached_counts() {
        let (backend, graph) = graph();
        let (a, b) = ids();
        let edge = graph.send_request(&a, &b).await.unwrap();
        graph.accept_request(&edge.id).await.unwrap();
        let loaded = graph.load_counts(&b).await.unwrap();

        backend.set_unavailable(true);
        assert!(matches!(
            graph.load_counts(&b).await,
            Err(Error::Transport(_))
        ));
        assert!(matches!(
            graph.unfollow(&a, &b).await,
            Err(Error::Transport(_))
        ));
        assert_eq!(graph.cached_counts(&b), loaded);

        backend.set_unavailable(false);
        assert_eq!(
            graph.get_status(&a, &b).await.unwrap(),
            Some(FollowStatus::Accepted)
        );
    }

    #[tokio::test]
    async fn test_pending_requests_joined_with_profiles() {
        let (backend, graph) = graph();
        let b = UserId::new("bob");
        let mut carol = Profile::new(UserId::new("carol"));
        carol.username = Some("carol_cello".to_string());
        backend.seed_profile(carol).unwrap();

        graph.send_request(&UserId::new("carol"), &b).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        graph.send_request(&UserId::new("dave"), &b).await.unwrap();

        let pending = graph.load_pending_requests_for(&b).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].requester.id.as_str(), "dave");
        assert_eq!(pending[0].requester.display_name, "unknown");
        assert_eq!(pending[1].requester.display_name, "carol_cello");
    }

    #[tokio::test]
    async fn test_followee_ids_and_lists() {
        let (backend, graph) = graph();
        let a = UserId::new("alice");
        for name in ["bob", "carol"] {
            let mut profile = Profile::new(UserId::new(name));
            profile.username = Some(name.to_string());
            backend.seed_profile(profile).unwrap();
            let edge = graph.send_request(&a, &UserId::new(name)).await.unwrap();
            graph.accept_request(&edge.id).await.unwrap();
        }
        graph.send_request(&a, &UserId::new("dave")).await.unwrap();

        let mut ids = graph.accepted_followee_ids(&a).await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![UserId::new("bob"), UserId::new("carol")]);

        let following = graph.list_following(&a).await.unwrap();
        assert_eq!(following.len(), 2);
        let followers = graph.list_followers(&UserId::new("bob")).await.unwrap();
        // alice has no profile row: listed as a placeholder, like a pending requester.
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].id, a);
        assert_eq!(followers[0].display_name, "unknown");
    }
}
