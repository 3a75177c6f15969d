//! [`Backend`] over the hosted PostgREST API.
//!
//! Tables live under `<url>/rest/v1/<table>`. Every request carries the
//! `apikey` header plus a bearer token. Filters use PostgREST operators
//! (`eq.`, `in.(…)`, `ilike.`), paging uses `limit`/`offset`, and counts
//! come from the `Content-Range` header of a `Prefer: count=exact` request.
//!
//! Status mapping: 2xx is success, 409 (unique or foreign-key violation)
//! maps to the caller's conflict error, anything else is
//! [`Error::Transport`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use practice_room_core::backend::Backend;
use practice_room_core::comments::NewComment;
use practice_room_core::models::{
    Comment, CommentWithAuthor, EdgeFilter, EdgeId, FollowDirection, FollowEdge, FollowStatus,
    NewVideo, PendingRequest, Profile, ProfileSummary, UserId, VideoId, VideoItem,
};
use practice_room_core::{Error, Result};

use crate::config::RestConfig;

type Query = Vec<(&'static str, String)>;

pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Builds a client from `[rest]`, reading the key from `api_key_env`.
    pub fn from_config(config: &RestConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} not set", config.api_key_env))?;
        Self::new(
            &config.url,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
    }

    async fn send(&self, req: RequestBuilder, on_conflict: Option<Error>) -> Result<Response> {
        let resp = req.send().await.map_err(Error::transport)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::CONFLICT {
            if let Some(err) = on_conflict {
                return Err(err);
            }
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Transport(format!("HTTP {}: {}", status, body)))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
        let req = self
            .request(Method::GET, table)
            .query(&[("select", "*")])
            .query(query);
        rows(self.send(req, None).await?).await
    }

    async fn fetch_videos(
        &self,
        mut query: Query,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoItem>> {
        query.push(("order", "created_at.desc".to_string()));
        query.extend(page_query(limit, offset));
        self.select("videos", &query).await
    }

    async fn profiles_by_id(&self, ids: &[UserId]) -> Result<HashMap<UserId, Profile>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let profiles: Vec<Profile> = self
            .select("profiles", &vec![("id", in_filter(ids))])
            .await?;
        Ok(profiles.into_iter().map(|p| (p.id.clone(), p)).collect())
    }
}

async fn rows<T: DeserializeOwned>(resp: Response) -> Result<Vec<T>> {
    resp.json().await.map_err(Error::transport)
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

fn in_filter(ids: &[UserId]) -> String {
    let joined: Vec<&str> = ids.iter().map(UserId::as_str).collect();
    format!("in.({})", joined.join(","))
}

/// Case-insensitive substring filter. PostgREST uses `*` as the wildcard
/// in URLs; `%`, `_` and `\` in the user's text are escaped so they match
/// literally.
fn ilike_filter(text: &str) -> String {
    let mut filter = String::with_capacity(text.len() + 8);
    filter.push_str("ilike.*");
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            filter.push('\\');
        }
        filter.push(c);
    }
    filter.push('*');
    filter
}

fn page_query(limit: usize, offset: usize) -> Query {
    vec![("limit", limit.to_string()), ("offset", offset.to_string())]
}

fn direction_column(direction: FollowDirection) -> &'static str {
    match direction {
        FollowDirection::Followers => "following_id",
        FollowDirection::Following => "follower_id",
    }
}

/// Total from a `Content-Range` value such as `0-9/57` or `*/0`.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

fn summary_from(profiles: &HashMap<UserId, Profile>, id: &UserId) -> ProfileSummary {
    profiles
        .get(id)
        .map(Profile::summary)
        .unwrap_or_else(|| ProfileSummary::unknown(id.clone()))
}

#[async_trait]
impl Backend for RestBackend {
    async fn fetch_global_page(&self, limit: usize, offset: usize) -> Result<Vec<VideoItem>> {
        self.fetch_videos(Vec::new(), limit, offset).await
    }

    async fn fetch_following_page(
        &self,
        owners: &[UserId],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoItem>> {
        if owners.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_videos(vec![("user_id", in_filter(owners))], limit, offset)
            .await
    }

    async fn fetch_user_page(
        &self,
        owner: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoItem>> {
        self.fetch_videos(vec![("user_id", eq(owner))], limit, offset)
            .await
    }

    async fn insert_video(&self, video: &NewVideo) -> Result<VideoItem> {
        let req = self
            .request(Method::POST, "videos")
            .header("Prefer", "return=representation")
            .json(video);
        let created: Vec<VideoItem> = rows(self.send(req, None).await?).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| Error::Transport("insert returned no video row".to_string()))
    }

    async fn delete_video(&self, id: &VideoId) -> Result<bool> {
        let req = self
            .request(Method::DELETE, "videos")
            .header("Prefer", "return=representation")
            .query(&[("id", eq(id)), ("select", "id".to_string())]);
        let deleted: Vec<serde_json::Value> = rows(self.send(req, None).await?).await?;
        Ok(!deleted.is_empty())
    }

    async fn insert_follow_edge(
        &self,
        follower: &UserId,
        followee: &UserId,
        status: FollowStatus,
    ) -> Result<FollowEdge> {
        let req = self
            .request(Method::POST, "follows")
            .header("Prefer", "return=representation")
            .json(&json!({
                "follower_id": follower,
                "following_id": followee,
                "status": status,
            }));
        let duplicate = Error::DuplicateRequest {
            follower: follower.clone(),
            followee: followee.clone(),
        };
        let created: Vec<FollowEdge> = rows(self.send(req, Some(duplicate)).await?).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| Error::Transport("insert returned no follow row".to_string()))
    }

    async fn get_follow_edge(&self, id: &EdgeId) -> Result<Option<FollowEdge>> {
        let edges: Vec<FollowEdge> = self
            .select("follows", &vec![("id", eq(id)), ("limit", "1".to_string())])
            .await?;
        Ok(edges.into_iter().next())
    }

    async fn update_follow_edge_status(&self, id: &EdgeId, status: FollowStatus) -> Result<()> {
        let req = self
            .request(Method::PATCH, "follows")
            .header("Prefer", "return=representation")
            .query(&[("id", eq(id))])
            .json(&json!({ "status": status }));
        let updated: Vec<serde_json::Value> = rows(self.send(req, None).await?).await?;
        if updated.is_empty() {
            return Err(Error::NotFound(format!("follow edge {}", id)));
        }
        Ok(())
    }

    async fn delete_follow_edges(&self, filter: &EdgeFilter) -> Result<u64> {
        let query: Query = match filter {
            EdgeFilter::ById(id) => vec![("id", eq(id))],
            EdgeFilter::Pair {
                follower,
                followee,
                status,
            } => vec![
                ("follower_id", eq(follower)),
                ("following_id", eq(followee)),
                ("status", eq(status)),
            ],
        };
        let req = self
            .request(Method::DELETE, "follows")
            .header("Prefer", "return=representation")
            .query(&query)
            .query(&[("select", "id")]);
        let deleted: Vec<serde_json::Value> = rows(self.send(req, None).await?).await?;
        Ok(deleted.len() as u64)
    }

    async fn query_follow_edge(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<Option<FollowEdge>> {
        let mut edges: Vec<FollowEdge> = self
            .select(
                "follows",
                &vec![("follower_id", eq(follower)), ("following_id", eq(followee))],
            )
            .await?;
        edges.sort_by_key(|e| !e.status.is_active());
        Ok(edges.into_iter().next())
    }

    async fn count_follow_edges(
        &self,
        user: &UserId,
        direction: FollowDirection,
        status: FollowStatus,
    ) -> Result<u64> {
        let req = self
            .request(Method::HEAD, "follows")
            .header("Prefer", "count=exact")
            .query(&[
                ("select", "id".to_string()),
                (direction_column(direction), eq(user)),
                ("status", eq(status)),
            ]);
        let resp = self.send(req, None).await?;
        let range = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Transport("count response had no Content-Range".to_string()))?;
        parse_content_range_total(range)
            .ok_or_else(|| Error::Transport(format!("unparseable Content-Range '{}'", range)))
    }

    async fn list_follow_edges(
        &self,
        user: &UserId,
        direction: FollowDirection,
        status: FollowStatus,
    ) -> Result<Vec<FollowEdge>> {
        self.select(
            "follows",
            &vec![
                (direction_column(direction), eq(user)),
                ("status", eq(status)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn list_pending_requests(&self, followee: &UserId) -> Result<Vec<PendingRequest>> {
        let edges = self
            .list_follow_edges(followee, FollowDirection::Followers, FollowStatus::Pending)
            .await?;
        let requesters: Vec<UserId> = edges.iter().map(|e| e.follower_id.clone()).collect();
        let profiles = self.profiles_by_id(&requesters).await?;
        debug!(
            requests = edges.len(),
            profiles = profiles.len(),
            "rest: pending requests joined"
        );
        Ok(edges
            .into_iter()
            .map(|edge| {
                let requester = summary_from(&profiles, &edge.follower_id);
                PendingRequest { edge, requester }
            })
            .collect())
    }

    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>> {
        let profiles: Vec<Profile> = self
            .select("profiles", &vec![("id", eq(id)), ("limit", "1".to_string())])
            .await?;
        Ok(profiles.into_iter().next())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let req = self
            .request(Method::POST, "profiles")
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(profile);
        self.send(req, None).await?;
        Ok(())
    }

    async fn search_profiles(
        &self,
        pattern: &str,
        exclude: &UserId,
        limit: usize,
    ) -> Result<Vec<Profile>> {
        self.select(
            "profiles",
            &vec![
                ("username", ilike_filter(pattern)),
                ("id", format!("neq.{}", exclude)),
                ("order", "username.asc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        let req = self
            .request(Method::POST, "comments")
            .header("Prefer", "return=representation")
            .json(&json!({
                "video_id": comment.video_id(),
                "user_id": comment.author_id(),
                "good_thing": comment.good_thing(),
                "improvement": comment.improvement(),
            }));
        let missing_video = Error::NotFound(format!("video {}", comment.video_id()));
        let created: Vec<Comment> = rows(self.send(req, Some(missing_video)).await?).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| Error::Transport("insert returned no comment row".to_string()))
    }

    async fn list_comments(&self, video: &VideoId) -> Result<Vec<CommentWithAuthor>> {
        let comments: Vec<Comment> = self
            .select(
                "comments",
                &vec![
                    ("video_id", eq(video)),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        let mut authors: Vec<UserId> = comments.iter().map(|c| c.user_id.clone()).collect();
        authors.sort();
        authors.dedup();
        let profiles = self.profiles_by_id(&authors).await?;
        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = summary_from(&profiles, &comment.user_id);
                CommentWithAuthor { comment, author }
            })
            .collect())
    }
}
