//! SQLite-backed [`Backend`] implementation.
//!
//! A local stand-in for the hosted database. Every trait method is one or
//! two SQL statements against the schema created by
//! [`migrate::create_schema`](crate::migrate::create_schema). The
//! `UNIQUE(follower_id, following_id)` constraint on `follows` backs the
//! duplicate-request check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use practice_room_core::backend::Backend;
use practice_room_core::comments::NewComment;
use practice_room_core::models::{
    Comment, CommentId, CommentWithAuthor, EdgeFilter, EdgeId, FollowDirection, FollowEdge,
    FollowStatus, NewVideo, PendingRequest, Profile, ProfileSummary, UserId, VideoId, VideoItem,
};
use practice_room_core::{Error, Result};

use crate::config::Config;
use crate::{db, migrate};

const VIDEO_COLUMNS: &str = "id, title, description, video_url, user_id, created_at, updated_at";
const EDGE_COLUMNS: &str = "id, follower_id, following_id, status, created_at";

/// SQLite implementation of the [`Backend`] trait.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::create_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn fetch_videos(
        &self,
        filter: &str,
        owners: &[&UserId],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoItem>> {
        let sql = format!(
            "SELECT {} FROM videos {} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            VIDEO_COLUMNS, filter
        );
        let mut query = sqlx::query(&sql);
        for owner in owners {
            query = query.bind(owner.as_str());
        }
        let rows = query
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(sql_error)?;
        rows.iter().map(video_from_row).collect()
    }

    async fn summary_of(&self, id: &UserId) -> Result<ProfileSummary> {
        Ok(self
            .get_profile(id)
            .await?
            .map(|p| p.summary())
            .unwrap_or_else(|| ProfileSummary::unknown(id.clone())))
    }
}

fn sql_error(e: sqlx::Error) -> Error {
    Error::transport(e)
}

fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn from_micros(us: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us)
        .ok_or_else(|| Error::Transport(format!("invalid stored timestamp {}", us)))
}

fn video_from_row(row: &SqliteRow) -> Result<VideoItem> {
    Ok(VideoItem {
        id: VideoId::new(row.get::<String, _>("id")),
        title: row.get("title"),
        description: row.get("description"),
        video_url: row.get("video_url"),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        created_at: from_micros(row.get("created_at"))?,
        updated_at: row
            .get::<Option<i64>, _>("updated_at")
            .map(from_micros)
            .transpose()?,
    })
}

fn edge_from_row(row: &SqliteRow) -> Result<FollowEdge> {
    Ok(FollowEdge {
        id: EdgeId::new(row.get::<String, _>("id")),
        follower_id: UserId::new(row.get::<String, _>("follower_id")),
        followee_id: UserId::new(row.get::<String, _>("following_id")),
        status: row.get::<String, _>("status").parse()?,
        created_at: from_micros(row.get("created_at"))?,
    })
}

fn profile_from_row(row: &SqliteRow) -> Profile {
    Profile {
        id: UserId::new(row.get::<String, _>("id")),
        username: row.get("username"),
        full_name: row.get("full_name"),
        instrument: row.get("instrument"),
        avatar_url: row.get("avatar_url"),
    }
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: CommentId::new(row.get::<String, _>("id")),
        video_id: VideoId::new(row.get::<String, _>("video_id")),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        good_thing: row.get("good_thing"),
        improvement: row.get("improvement"),
        created_at: from_micros(row.get("created_at"))?,
    })
}

fn direction_column(direction: FollowDirection) -> &'static str {
    match direction {
        FollowDirection::Followers => "following_id",
        FollowDirection::Following => "follower_id",
    }
}

/// Escapes `LIKE` wildcards so user input matches literally.
fn like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    escaped.push('%');
    for c in input.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn fetch_global_page(&self, limit: usize, offset: usize) -> Result<Vec<VideoItem>> {
        self.fetch_videos("", &[], limit, offset).await
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
        let placeholders = vec!["?"; owners.len()].join(", ");
        let filter = format!("WHERE user_id IN ({})", placeholders);
        let owners: Vec<&UserId> = owners.iter().collect();
        self.fetch_videos(&filter, &owners, limit, offset).await
    }

    async fn fetch_user_page(
        &self,
        owner: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoItem>> {
        self.fetch_videos("WHERE user_id = ?", &[owner], limit, offset)
            .await
    }

    async fn insert_video(&self, video: &NewVideo) -> Result<VideoItem> {
        let item = VideoItem {
            id: VideoId::generate(),
            title: video.title.clone(),
            description: video.description.clone(),
            video_url: video.video_url.clone(),
            user_id: video.user_id.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        sqlx::query(
            r#"
            INSERT INTO videos (id, title, description, video_url, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(item.id.as_str())
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.video_url)
        .bind(item.user_id.as_str())
        .bind(to_micros(item.created_at))
        .execute(&self.pool)
        .await
        .map_err(sql_error)?;
        Ok(item)
    }

    // Comments go with the video through ON DELETE CASCADE.
    async fn delete_video(&self, id: &VideoId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_follow_edge(
        &self,
        follower: &UserId,
        followee: &UserId,
        status: FollowStatus,
    ) -> Result<FollowEdge> {
        let edge = FollowEdge {
            id: EdgeId::generate(),
            follower_id: follower.clone(),
            followee_id: followee.clone(),
            status,
            created_at: Utc::now(),
        };
        let inserted = sqlx::query(
            r#"
            INSERT INTO follows (id, follower_id, following_id, status, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(edge.id.as_str())
        .bind(edge.follower_id.as_str())
        .bind(edge.followee_id.as_str())
        .bind(edge.status.as_str())
        .bind(to_micros(edge.created_at))
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(edge),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Error::DuplicateRequest {
                    follower: follower.clone(),
                    followee: followee.clone(),
                })
            }
            Err(e) => Err(sql_error(e)),
        }
    }

    async fn get_follow_edge(&self, id: &EdgeId) -> Result<Option<FollowEdge>> {
        let sql = format!("SELECT {} FROM follows WHERE id = ?", EDGE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(sql_error)?;
        row.as_ref().map(edge_from_row).transpose()
    }

    async fn update_follow_edge_status(&self, id: &EdgeId, status: FollowStatus) -> Result<()> {
        let result = sqlx::query("UPDATE follows SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(sql_error)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("follow edge {}", id)));
        }
        Ok(())
    }

    async fn delete_follow_edges(&self, filter: &EdgeFilter) -> Result<u64> {
        let result = match filter {
            EdgeFilter::ById(id) => sqlx::query("DELETE FROM follows WHERE id = ?")
                .bind(id.as_str())
                .execute(&self.pool)
                .await,
            EdgeFilter::Pair {
                follower,
                followee,
                status,
            } => sqlx::query(
                "DELETE FROM follows WHERE follower_id = ? AND following_id = ? AND status = ?",
            )
            .bind(follower.as_str())
            .bind(followee.as_str())
            .bind(status.as_str())
            .execute(&self.pool)
            .await,
        }
        .map_err(sql_error)?;
        Ok(result.rows_affected())
    }

    async fn query_follow_edge(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<Option<FollowEdge>> {
        let sql = format!(
            "SELECT {} FROM follows WHERE follower_id = ? AND following_id = ? \
             ORDER BY CASE status WHEN 'rejected' THEN 1 ELSE 0 END LIMIT 1",
            EDGE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(follower.as_str())
            .bind(followee.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(sql_error)?;
        row.as_ref().map(edge_from_row).transpose()
    }

    async fn count_follow_edges(
        &self,
        user: &UserId,
        direction: FollowDirection,
        status: FollowStatus,
    ) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM follows WHERE {} = ? AND status = ?",
            direction_column(direction)
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user.as_str())
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(sql_error)?;
        Ok(count.max(0) as u64)
    }

    async fn list_follow_edges(
        &self,
        user: &UserId,
        direction: FollowDirection,
        status: FollowStatus,
    ) -> Result<Vec<FollowEdge>> {
        let sql = format!(
            "SELECT {} FROM follows WHERE {} = ? AND status = ? \
             ORDER BY created_at DESC, rowid DESC",
            EDGE_COLUMNS,
            direction_column(direction)
        );
        let rows = sqlx::query(&sql)
            .bind(user.as_str())
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(sql_error)?;
        rows.iter().map(edge_from_row).collect()
    }

    async fn list_pending_requests(&self, followee: &UserId) -> Result<Vec<PendingRequest>> {
        let rows = sqlx::query(
            r#"
            SELECT f.id, f.follower_id, f.following_id, f.status, f.created_at,
                   p.id AS profile_id, p.username, p.full_name, p.instrument, p.avatar_url
            FROM follows f
            LEFT JOIN profiles p ON p.id = f.follower_id
            WHERE f.following_id = ? AND f.status = 'pending'
            ORDER BY f.created_at DESC, f.rowid DESC
            "#,
        )
        .bind(followee.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(sql_error)?;

        rows.iter()
            .map(|row| {
                let edge = edge_from_row(row)?;
                let requester = match row.get::<Option<String>, _>("profile_id") {
                    Some(id) => Profile {
                        id: UserId::new(id),
                        username: row.get("username"),
                        full_name: row.get("full_name"),
                        instrument: row.get("instrument"),
                        avatar_url: row.get("avatar_url"),
                    }
                    .summary(),
                    None => ProfileSummary::unknown(edge.follower_id.clone()),
                };
                Ok(PendingRequest { edge, requester })
            })
            .collect()
    }

    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT id, username, full_name, instrument, avatar_url FROM profiles WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(sql_error)?;
        Ok(row.as_ref().map(profile_from_row))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, username, full_name, instrument, avatar_url)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                full_name = excluded.full_name,
                instrument = excluded.instrument,
                avatar_url = excluded.avatar_url
            "#,
        )
        .bind(profile.id.as_str())
        .bind(&profile.username)
        .bind(&profile.full_name)
        .bind(&profile.instrument)
        .bind(&profile.avatar_url)
        .execute(&self.pool)
        .await
        .map_err(sql_error)?;
        Ok(())
    }

    async fn search_profiles(
        &self,
        pattern: &str,
        exclude: &UserId,
        limit: usize,
    ) -> Result<Vec<Profile>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, full_name, instrument, avatar_url
            FROM profiles
            WHERE id != ? AND username IS NOT NULL AND LOWER(username) LIKE ? ESCAPE '\'
            ORDER BY username
            LIMIT ?
            "#,
        )
        .bind(exclude.as_str())
        .bind(like_pattern(pattern))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(sql_error)?;
        Ok(rows.iter().map(profile_from_row).collect())
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        let known_video: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM videos WHERE id = ?")
            .bind(comment.video_id().as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(sql_error)?;
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
        sqlx::query(
            r#"
            INSERT INTO comments (id, video_id, user_id, good_thing, improvement, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(stored.id.as_str())
        .bind(stored.video_id.as_str())
        .bind(stored.user_id.as_str())
        .bind(&stored.good_thing)
        .bind(&stored.improvement)
        .bind(to_micros(stored.created_at))
        .execute(&self.pool)
        .await
        .map_err(sql_error)?;
        Ok(stored)
    }

    async fn list_comments(&self, video: &VideoId) -> Result<Vec<CommentWithAuthor>> {
        let rows = sqlx::query(
            r#"
            SELECT id, video_id, user_id, good_thing, improvement, created_at
            FROM comments
            WHERE video_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(video.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(sql_error)?;

        let mut thread = Vec::with_capacity(rows.len());
        for row in &rows {
            let comment = comment_from_row(row)?;
            let author = self.summary_of(&comment.user_id).await?;
            thread.push(CommentWithAuthor { comment, author });
        }
        Ok(thread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Viola"), "%viola%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_micros_round_trip_keeps_precision() {
        let now = Utc::now();
        let back = from_micros(to_micros(now)).unwrap();
        assert_eq!(back.timestamp_micros(), now.timestamp_micros());
    }
}
