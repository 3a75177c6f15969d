//! Core data models shared by the feed, the follow graph and every backend.
//!
//! Field names follow the hosted backend's column names so the same types
//! serialize straight into REST payloads and deserialize from SQL rows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier, lower-casing it so ids compare the
            /// same way the backend round-trips them.
            pub fn new(raw: impl AsRef<str>) -> Self {
                Self(raw.as_ref().trim().to_lowercase())
            }

            /// Fresh random (UUID v4) identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self::new(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Account identifier (the auth user's UUID).
    UserId
);
opaque_id!(
    /// Video row identifier.
    VideoId
);
opaque_id!(
    /// Follow edge identifier.
    EdgeId
);
opaque_id!(CommentId);

/// A practice video as returned by the backend. Never mutated client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: VideoId,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Metadata for a freshly uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub user_id: UserId,
}

impl NewVideo {
    /// Builds upload metadata; a blank description is stored as absent.
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        video_url: impl Into<String>,
        user_id: UserId,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.filter(|d| !d.trim().is_empty()),
            video_url: video_url.into(),
            user_id,
        }
    }
}

/// Status of a follow edge.
///
/// `Rejected` exists in the backend's enum but is never persisted by this
/// client: rejecting a request deletes the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FollowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowStatus::Pending => "pending",
            FollowStatus::Accepted => "accepted",
            FollowStatus::Rejected => "rejected",
        }
    }

    /// Pending and accepted edges block a new request for the same pair.
    pub fn is_active(&self) -> bool {
        matches!(self, FollowStatus::Pending | FollowStatus::Accepted)
    }
}

impl fmt::Display for FollowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FollowStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(FollowStatus::Pending),
            "accepted" => Ok(FollowStatus::Accepted),
            "rejected" => Ok(FollowStatus::Rejected),
            other => Err(Error::Validation(format!(
                "unknown follow status '{}'",
                other
            ))),
        }
    }
}

/// Which side of the edge the queried user sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDirection {
    /// Edges where the user is the followee.
    Followers,
    /// Edges where the user is the follower.
    Following,
}

/// A directed follow relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub id: EdgeId,
    pub follower_id: UserId,
    #[serde(rename = "following_id")]
    pub followee_id: UserId,
    pub status: FollowStatus,
    pub created_at: DateTime<Utc>,
}

/// Selects which edges a delete applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeFilter {
    ById(EdgeId),
    Pair {
        follower: UserId,
        followee: UserId,
        status: FollowStatus,
    },
}

/// Accepted-edge counts for one user. Never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    pub follower_count: u64,
    pub following_count: u64,
}

impl FollowCounts {
    pub fn decrement_followers(&mut self) {
        self.follower_count = self.follower_count.saturating_sub(1);
    }
}

/// A user's public profile row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub instrument: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            username: None,
            full_name: None,
            instrument: None,
            avatar_url: None,
        }
    }

    pub fn summary(&self) -> ProfileSummary {
        let display_name = self
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .or(self.full_name.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or("unknown")
            .to_string();
        ProfileSummary {
            id: self.id.clone(),
            display_name,
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// The bits of a profile shown next to a request or comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl ProfileSummary {
    /// Placeholder for a user whose profile row is missing.
    pub fn unknown(id: UserId) -> Self {
        Self {
            id,
            display_name: "unknown".to_string(),
            avatar_url: None,
        }
    }
}

/// A pending follow request joined with the requester's profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingRequest {
    pub edge: FollowEdge,
    pub requester: ProfileSummary,
}

/// Structured feedback left on a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub video_id: VideoId,
    pub user_id: UserId,
    pub good_thing: String,
    pub improvement: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: ProfileSummary,
}
