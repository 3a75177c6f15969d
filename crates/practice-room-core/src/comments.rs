//! Structured feedback comments on practice videos.
//!
//! Every comment names something that went well; a suggestion for
//! improvement is optional.

use std::sync::Arc;

use tracing::debug;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::models::{CommentWithAuthor, UserId, VideoId};

/// A validated comment ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    video_id: VideoId,
    author_id: UserId,
    good_thing: String,
    improvement: Option<String>,
}

impl NewComment {
    /// Trims both fields. `good_thing` must not be blank; a blank
    /// `improvement` is dropped.
    pub fn new(
        video_id: VideoId,
        author_id: UserId,
        good_thing: &str,
        improvement: Option<&str>,
    ) -> Result<Self> {
        let good_thing = good_thing.trim();
        if good_thing.is_empty() {
            return Err(Error::Validation(
                "a comment must say what was good".to_string(),
            ));
        }
        let improvement = improvement
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self {
            video_id,
            author_id,
            good_thing: good_thing.to_string(),
            improvement,
        })
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn author_id(&self) -> &UserId {
        &self.author_id
    }

    pub fn good_thing(&self) -> &str {
        &self.good_thing
    }

    pub fn improvement(&self) -> Option<&str> {
        self.improvement.as_deref()
    }
}

/// Comment thread for one video.
pub struct CommentThread {
    backend: Arc<dyn Backend>,
    video_id: VideoId,
}

impl CommentThread {
    pub fn new(backend: Arc<dyn Backend>, video_id: VideoId) -> Self {
        Self { backend, video_id }
    }

    pub async fn load(&self) -> Result<Vec<CommentWithAuthor>> {
        self.backend.list_comments(&self.video_id).await
    }

    /// Stores `comment` and returns the refreshed thread.
    pub async fn add(&self, comment: NewComment) -> Result<Vec<CommentWithAuthor>> {
        if comment.video_id() != &self.video_id {
            return Err(Error::Validation(format!(
                "comment targets video {} but the thread is for {}",
                comment.video_id(),
                self.video_id
            )));
        }
        let stored = self.backend.insert_comment(&comment).await?;
        debug!(comment = %stored.id, video = %self.video_id, "comments: added");
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use crate::models::{NewVideo, Profile};

    #[test]
    fn test_blank_good_thing_rejected() {
        let err = NewComment::new(VideoId::new("v"), UserId::new("u"), "   \n", None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_fields_are_trimmed() {
        let comment = NewComment::new(
            VideoId::new("v"),
            UserId::new("u"),
            "  clean shifts ",
            Some("   "),
        )
        .unwrap();
        assert_eq!(comment.good_thing(), "clean shifts");
        assert_eq!(comment.improvement(), None);
    }

    #[tokio::test]
    async fn test_add_returns_refreshed_thread() {
        let backend = Arc::new(InMemoryBackend::new());
        let owner = UserId::new("owner");
        let video = backend
            .insert_video(&NewVideo::new("Bach C minor", None, "https://cdn/x.mp4", owner))
            .await
            .unwrap();
        let mut critic = Profile::new(UserId::new("critic"));
        critic.username = Some("pablo".to_string());
        backend.seed_profile(critic).unwrap();

        let thread = CommentThread::new(backend.clone(), video.id.clone());
        assert!(thread.load().await.unwrap().is_empty());

        let comment = NewComment::new(
            video.id.clone(),
            UserId::new("critic"),
            "Great tone",
            Some("Watch the tempo in bar 12"),
        )
        .unwrap();
        let refreshed = thread.add(comment).await.unwrap();
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].author.display_name, "pablo");
        assert_eq!(
            refreshed[0].comment.improvement.as_deref(),
            Some("Watch the tempo in bar 12")
        );
    }

    #[tokio::test]
    async fn test_comment_on_missing_video() {
        let backend = Arc::new(InMemoryBackend::new());
        let thread = CommentThread::new(backend, VideoId::new("gone"));
        let comment = NewComment::new(VideoId::new("gone"), UserId::new("u"), "nice", None).unwrap();
        assert!(matches!(
            thread.add(comment).await,
            Err(Error::NotFound(_))
        ));
    }
}
