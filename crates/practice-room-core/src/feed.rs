//! Windowed infinite-scroll pagination over a video feed.
//!
//! [`FeedPager`] holds a bounded, deduplicated, newest-first window of
//! [`VideoItem`]s and grows it one page at a time from a [`Backend`].
//!
//! # Window algorithm
//!
//! 1. `load_initial(mode)` fetches `page_size` items at offset 0 and
//!    replaces the window wholesale.
//! 2. `load_more()` fetches at `cursor_offset`, appends items whose id is
//!    not already held, and advances the cursor by the *raw* page length.
//! 3. A short page (fewer than `page_size`) or an empty page marks the feed
//!    exhausted until the next `load_initial`.
//! 4. When the window exceeds `max_window_size`, the oldest-scrolled items
//!    are trimmed from the front and the cursor is pulled back by the same
//!    amount (clamped at 0), so `cursor_offset` always equals raw items
//!    fetched minus items trimmed.
//!
//! # Ordering
//!
//! Only one load is in flight per pager. `load_more` while any load is
//! pending is a no-op. `load_initial` always wins: it bumps a generation
//! counter, and a response that arrives tagged with an older generation is
//! dropped instead of being applied to the new mode's window. State is
//! committed only after a fetch succeeds, so a failure leaves the window
//! exactly as it was and no partially applied state is ever observable.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::models::{UserId, VideoItem};

/// Page and window sizes for a [`FeedPager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    /// Items requested per fetch.
    pub page_size: usize,
    /// Upper bound on items held in memory.
    pub max_window_size: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_window_size: 20,
        }
    }
}

impl FeedSettings {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Validation("feed page_size must be >= 1".to_string()));
        }
        if self.max_window_size < self.page_size {
            return Err(Error::Validation(format!(
                "feed max_window_size ({}) must be >= page_size ({})",
                self.max_window_size, self.page_size
            )));
        }
        Ok(())
    }
}

/// Which videos the feed draws from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FeedMode {
    /// Every user's videos.
    Global,
    /// Videos owned by the given (accepted) followees.
    Following(Vec<UserId>),
}

impl FeedMode {
    pub fn name(&self) -> &'static str {
        match self {
            FeedMode::Global => "global",
            FeedMode::Following(_) => "following",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedPhase {
    Idle,
    LoadingInitial,
    LoadingMore,
    /// No further pages for the current mode; cleared by `load_initial`.
    Exhausted,
}

/// Point-in-time copy of the pager state, returned by every operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub items: Vec<VideoItem>,
    pub cursor_offset: usize,
    pub exhausted: bool,
    pub phase: FeedPhase,
    /// `None` until the first successful `load_initial`.
    pub mode: Option<FeedMode>,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Initial,
    More,
}

#[derive(Debug, Default)]
struct FeedState {
    items: Vec<VideoItem>,
    cursor_offset: usize,
    exhausted: bool,
    mode: Option<FeedMode>,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl FeedState {
    fn phase(&self) -> FeedPhase {
        match self.in_flight {
            Some(InFlight::Initial) => FeedPhase::LoadingInitial,
            Some(InFlight::More) => FeedPhase::LoadingMore,
            None if self.exhausted => FeedPhase::Exhausted,
            None => FeedPhase::Idle,
        }
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            items: self.items.clone(),
            cursor_offset: self.cursor_offset,
            exhausted: self.exhausted,
            phase: self.phase(),
            mode: self.mode.clone(),
            generation: self.generation,
        }
    }

    fn holds(&self, item: &VideoItem) -> bool {
        self.items.iter().any(|held| held.id == item.id)
    }
}

/// Bounded, deduplicated, forward-only view over a backend video feed.
pub struct FeedPager {
    backend: Arc<dyn Backend>,
    settings: FeedSettings,
    state: Mutex<FeedState>,
}

impl FeedPager {
    pub fn new(backend: Arc<dyn Backend>, settings: FeedSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            backend,
            settings,
            state: Mutex::new(FeedState::default()),
        })
    }

    pub fn settings(&self) -> FeedSettings {
        self.settings
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.lock().snapshot()
    }

    /// Replaces the window with the first page of `mode`.
    ///
    /// Supersedes any load already in flight; a superseded call returns the
    /// current snapshot without applying its own response.
    pub async fn load_initial(&self, mode: FeedMode) -> Result<FeedSnapshot> {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.in_flight = Some(InFlight::Initial);
            state.generation
        };
        debug!(mode = mode.name(), generation, "feed: loading initial page");

        let fetched = match &mode {
            FeedMode::Following(ids) if ids.is_empty() => Ok(Vec::new()),
            _ => self.fetch(&mode, 0).await,
        };

        let mut state = self.lock();
        if state.generation != generation {
            warn!(
                mode = mode.name(),
                generation,
                current = state.generation,
                "feed: dropping superseded initial page"
            );
            return Ok(state.snapshot());
        }
        state.in_flight = None;
        let page = fetched?;

        let fetched_count = page.len();
        let mut items: Vec<VideoItem> = Vec::with_capacity(fetched_count);
        for item in page {
            if !items.iter().any(|held| held.id == item.id) {
                items.push(item);
            }
        }
        state.items = items;
        state.cursor_offset = fetched_count;
        state.exhausted = fetched_count < self.settings.page_size;
        state.mode = Some(mode);
        debug!(
            fetched = fetched_count,
            exhausted = state.exhausted,
            "feed: initial page applied"
        );
        Ok(state.snapshot())
    }

    /// Appends the next page to the window.
    ///
    /// Returns immediately with the current snapshot when a load is in
    /// flight, the feed is exhausted, or no feed has been opened yet.
    pub async fn load_more(&self) -> Result<FeedSnapshot> {
        let (generation, mode, offset) = {
            let mut state = self.lock();
            if state.in_flight.is_some() || state.exhausted {
                return Ok(state.snapshot());
            }
            let mode = match state.mode.clone() {
                Some(mode) => mode,
                None => return Ok(state.snapshot()),
            };
            state.in_flight = Some(InFlight::More);
            (state.generation, mode, state.cursor_offset)
        };
        debug!(mode = mode.name(), offset, "feed: loading more");

        let fetched = self.fetch(&mode, offset).await;

        let mut state = self.lock();
        if state.generation != generation {
            warn!(
                mode = mode.name(),
                generation,
                current = state.generation,
                "feed: dropping stale page after feed switch"
            );
            return Ok(state.snapshot());
        }
        state.in_flight = None;
        let page = fetched?;

        if page.is_empty() {
            state.exhausted = true;
            debug!(offset, "feed: empty page, exhausted");
            return Ok(state.snapshot());
        }

        let fetched_count = page.len();
        for item in page {
            if !state.holds(&item) {
                state.items.push(item);
            }
        }
        state.cursor_offset += fetched_count;
        state.exhausted = fetched_count < self.settings.page_size;

        let overflow = state
            .items
            .len()
            .saturating_sub(self.settings.max_window_size);
        if overflow > 0 {
            state.items.drain(..overflow);
            state.cursor_offset = state.cursor_offset.saturating_sub(overflow);
            debug!(trimmed = overflow, "feed: window trimmed");
        }
        Ok(state.snapshot())
    }

    /// Reloads the current mode from the top. No-op before the first load.
    pub async fn reload(&self) -> Result<FeedSnapshot> {
        let mode = self.lock().mode.clone();
        match mode {
            Some(mode) => self.load_initial(mode).await,
            None => Ok(self.snapshot()),
        }
    }

    async fn fetch(&self, mode: &FeedMode, offset: usize) -> Result<Vec<VideoItem>> {
        let limit = self.settings.page_size;
        match mode {
            FeedMode::Global => self.backend.fetch_global_page(limit, offset).await,
            FeedMode::Following(ids) => {
                self.backend
                    .fetch_following_page(ids, limit, offset)
                    .await
            }
        }
    }

    // The guard is never held across an await, so a poisoned lock still
    // guards a consistent state.
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use crate::comments::NewComment;
    use crate::models::{
        Comment, CommentWithAuthor, EdgeFilter, EdgeId, FollowDirection, FollowEdge,
        FollowStatus, NewVideo, PendingRequest, Profile, VideoId,
    };
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    fn video(n: usize, owner: &str) -> VideoItem {
        VideoItem {
            id: VideoId::new(format!("v{:03}", n)),
            title: format!("scales #{}", n),
            description: None,
            video_url: format!("https://cdn.example/v{}.mp4", n),
            user_id: UserId::new(owner),
            created_at: Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap()
                + Duration::minutes(n as i64),
            updated_at: None,
        }
    }

    fn seeded(count: usize, owner: &str) -> Arc<InMemoryBackend> {
        let backend = Arc::new(InMemoryBackend::new());
        for n in 0..count {
            backend.seed_video(video(n, owner)).unwrap();
        }
        backend
    }

    fn pager(backend: Arc<dyn Backend>) -> FeedPager {
        FeedPager::new(backend, FeedSettings::default()).unwrap()
    }

    #[test]
    fn test_settings_validation() {
        assert!(FeedSettings::default().validate().is_ok());
        let zero = FeedSettings {
            page_size: 0,
            max_window_size: 20,
        };
        assert!(zero.validate().is_err());
        let small_window = FeedSettings {
            page_size: 10,
            max_window_size: 5,
        };
        assert!(small_window.validate().is_err());
    }

    #[tokio::test]
    async fn test_initial_full_page() {
        let pager = pager(seeded(30, "u1"));
        let snap = pager.load_initial(FeedMode::Global).await.unwrap();
        assert_eq!(snap.items.len(), 10);
        assert_eq!(snap.cursor_offset, 10);
        assert!(!snap.exhausted);
        assert_eq!(snap.phase, FeedPhase::Idle);
        assert_eq!(snap.items[0].id.as_str(), "v029");
    }

    #[tokio::test]
    async fn test_short_second_page_exhausts() {
        let pager = pager(seeded(14, "u1"));
        pager.load_initial(FeedMode::Global).await.unwrap();
        let snap = pager.load_more().await.unwrap();
        assert_eq!(snap.items.len(), 14);
        assert_eq!(snap.cursor_offset, 14);
        assert!(snap.exhausted);
        assert_eq!(snap.phase, FeedPhase::Exhausted);
    }

    #[tokio::test]
    async fn test_overflow_trims_front_and_pulls_cursor_back() {
        let backend = seeded(25, "u1");
        let pager = FeedPager::new(
            backend,
            FeedSettings {
                page_size: 10,
                max_window_size: 20,
            },
        )
        .unwrap();
        pager.load_initial(FeedMode::Global).await.unwrap();
        let before = pager.load_more().await.unwrap();
        assert_eq!(before.items.len(), 20);
        assert_eq!(before.cursor_offset, 20);

        let after = pager.load_more().await.unwrap();
        assert_eq!(after.items.len(), 20);
        // 5 new items appended, 5 trimmed from the top.
        assert_eq!(after.cursor_offset, before.cursor_offset + 5 - 5);
        assert_eq!(after.items[0].id, before.items[5].id);
        assert_eq!(after.items.last().unwrap().id.as_str(), "v000");
        assert!(after.exhausted);
    }

    #[tokio::test]
    async fn test_following_with_no_followees() {
        let backend = seeded(5, "u1");
        let pager = pager(backend.clone());
        let snap = pager.load_initial(FeedMode::Following(Vec::new())).await.unwrap();
        assert!(snap.items.is_empty());
        assert!(snap.exhausted);
        assert_eq!(backend.page_fetches(), 0);

        let again = pager.load_more().await.unwrap();
        assert_eq!(again, snap);
        assert_eq!(backend.page_fetches(), 0);
    }

    #[tokio::test]
    async fn test_following_restricts_owners() {
        let backend = seeded(6, "u1");
        for n in 6..9 {
            backend.seed_video(video(n, "u2")).unwrap();
        }
        let pager = pager(backend);
        let snap = pager
            .load_initial(FeedMode::Following(vec![UserId::new("u2")]))
            .await
            .unwrap();
        assert_eq!(snap.items.len(), 3);
        assert!(snap.items.iter().all(|v| v.user_id.as_str() == "u2"));
        assert!(snap.exhausted);
    }

    #[tokio::test]
    async fn test_shifted_page_skips_duplicates_but_counts_raw() {
        let backend = seeded(20, "u1");
        let pager = pager(backend.clone());
        pager.load_initial(FeedMode::Global).await.unwrap();

        // A new upload shifts every offset by one.
        backend.seed_video(video(100, "u2")).unwrap();
        let snap = pager.load_more().await.unwrap();

        assert_eq!(snap.cursor_offset, 20);
        assert_eq!(snap.items.len(), 19);
        let unique: HashSet<&str> = snap.items.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(unique.len(), snap.items.len());
    }

    #[tokio::test]
    async fn test_empty_page_sets_exhausted_without_touching_items() {
        let pager = pager(seeded(10, "u1"));
        let first = pager.load_initial(FeedMode::Global).await.unwrap();
        assert!(!first.exhausted);
        let snap = pager.load_more().await.unwrap();
        assert!(snap.exhausted);
        assert_eq!(snap.items, first.items);
        assert_eq!(snap.cursor_offset, 10);
    }

    #[tokio::test]
    async fn test_window_invariants_over_long_scroll() {
        let backend = seeded(57, "u1");
        let pager = pager(backend);
        let mut snap = pager.load_initial(FeedMode::Global).await.unwrap();
        let mut raw_fetched = snap.cursor_offset;
        let mut trimmed = 0usize;
        let mut was_exhausted = snap.exhausted;

        for _ in 0..100 {
            let before = snap.clone();
            snap = pager.load_more().await.unwrap();
            if before.exhausted {
                assert_eq!(snap, before);
                continue;
            }
            let new_ids = snap
                .items
                .iter()
                .filter(|v| !before.items.iter().any(|b| b.id == v.id))
                .count();
            let kept_old = snap.items.len() - new_ids;
            let dropped = before.items.len() - kept_old;
            let raw = snap.cursor_offset + dropped - before.cursor_offset;
            raw_fetched += raw;
            trimmed += dropped;

            let unique: HashSet<&str> = snap.items.iter().map(|v| v.id.as_str()).collect();
            assert_eq!(unique.len(), snap.items.len());
            assert!(snap.items.len() <= 20);
            assert_eq!(snap.cursor_offset, raw_fetched - trimmed);
            if was_exhausted {
                assert!(snap.exhausted);
            }
            was_exhausted = snap.exhausted;
        }
        assert!(snap.exhausted);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_state_untouched() {
        let backend = seeded(30, "u1");
        let pager = pager(backend.clone());
        let loaded = pager.load_initial(FeedMode::Global).await.unwrap();

        backend.set_unavailable(true);
        let err = pager.load_more().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(pager.snapshot(), loaded);

        let err = pager
            .load_initial(FeedMode::Following(vec![UserId::new("u9")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        let after = pager.snapshot();
        assert_eq!(after.items, loaded.items);
        assert_eq!(after.mode, Some(FeedMode::Global));
        assert_eq!(after.phase, FeedPhase::Idle);

        backend.set_unavailable(false);
        let retried = pager.load_more().await.unwrap();
        assert_eq!(retried.items.len(), 20);
    }

    #[tokio::test]
    async fn test_load_more_before_open_is_noop() {
        let backend = seeded(3, "u1");
        let pager = pager(backend.clone());
        let snap = pager.load_more().await.unwrap();
        assert!(snap.items.is_empty());
        assert_eq!(snap.mode, None);
        assert_eq!(backend.page_fetches(), 0);
    }

    #[tokio::test]
    async fn test_reload_resets_exhaustion() {
        let backend = seeded(4, "u1");
        let pager = pager(backend.clone());
        assert!(pager.load_initial(FeedMode::Global).await.unwrap().exhausted);
        for n in 4..20 {
            backend.seed_video(video(n, "u1")).unwrap();
        }
        let snap = pager.reload().await.unwrap();
        assert!(!snap.exhausted);
        assert_eq!(snap.items.len(), 10);
    }

    // ─── Concurrency ────────────────────────────────────────────────

    /// Delegates to an in-memory backend but can park global page fetches
    /// until the test releases them.
    struct GatedBackend {
        inner: Arc<InMemoryBackend>,
        hold: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl GatedBackend {
        fn new(inner: Arc<InMemoryBackend>) -> Self {
            Self {
                inner,
                hold: AtomicBool::new(false),
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl Backend for GatedBackend {
        async fn fetch_global_page(&self, limit: usize, offset: usize) -> Result<Vec<VideoItem>> {
            if self.hold.load(Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.fetch_global_page(limit, offset).await
        }

        async fn fetch_following_page(
            &self,
            owners: &[UserId],
            limit: usize,
            offset: usize,
        ) -> Result<Vec<VideoItem>> {
            self.inner.fetch_following_page(owners, limit, offset).await
        }

        async fn fetch_user_page(
            &self,
            owner: &UserId,
            limit: usize,
            offset: usize,
        ) -> Result<Vec<VideoItem>> {
            self.inner.fetch_user_page(owner, limit, offset).await
        }

        async fn insert_video(&self, video: &NewVideo) -> Result<VideoItem> {
            self.inner.insert_video(video).await
        }

        async fn delete_video(&self, id: &VideoId) -> Result<bool> {
            self.inner.delete_video(id).await
        }

        async fn insert_follow_edge(
            &self,
            follower: &UserId,
            followee: &UserId,
            status: FollowStatus,
        ) -> Result<FollowEdge> {
            self.inner.insert_follow_edge(follower, followee, status).await
        }

        async fn get_follow_edge(&self, id: &EdgeId) -> Result<Option<FollowEdge>> {
            self.inner.get_follow_edge(id).await
        }

        async fn update_follow_edge_status(&self, id: &EdgeId, status: FollowStatus) -> Result<()> {
            self.inner.update_follow_edge_status(id, status).await
        }

        async fn delete_follow_edges(&self, filter: &EdgeFilter) -> Result<u64> {
            self.inner.delete_follow_edges(filter).await
        }

        async fn query_follow_edge(
            &self,
            follower: &UserId,
            followee: &UserId,
        ) -> Result<Option<FollowEdge>> {
            self.inner.query_follow_edge(follower, followee).await
        }

        async fn count_follow_edges(
            &self,
            user: &UserId,
            direction: FollowDirection,
            status: FollowStatus,
        ) -> Result<u64> {
            self.inner.count_follow_edges(user, direction, status).await
        }

        async fn list_follow_edges(
            &self,
            user: &UserId,
            direction: FollowDirection,
            status: FollowStatus,
        ) -> Result<Vec<FollowEdge>> {
            self.inner.list_follow_edges(user, direction, status).await
        }

        async fn list_pending_requests(&self, followee: &UserId) -> Result<Vec<PendingRequest>> {
            self.inner.list_pending_requests(followee).await
        }

        async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>> {
            self.inner.get_profile(id).await
        }

        async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
            self.inner.upsert_profile(profile).await
        }

        async fn search_profiles(
            &self,
            pattern: &str,
            exclude: &UserId,
            limit: usize,
        ) -> Result<Vec<Profile>> {
            self.inner.search_profiles(pattern, exclude, limit).await
        }

        async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
            self.inner.insert_comment(comment).await
        }

        async fn list_comments(&self, video: &VideoId) -> Result<Vec<CommentWithAuthor>> {
            self.inner.list_comments(video).await
        }
    }

    fn gated_pager(inner: Arc<InMemoryBackend>) -> (Arc<GatedBackend>, Arc<FeedPager>) {
        let gated = Arc::new(GatedBackend::new(inner));
        let pager = Arc::new(FeedPager::new(gated.clone(), FeedSettings::default()).unwrap());
        (gated, pager)
    }

    #[tokio::test]
    async fn test_load_more_while_in_flight_is_ignored() {
        let (gated, pager) = gated_pager(seeded(40, "u1"));
        pager.load_initial(FeedMode::Global).await.unwrap();

        gated.hold.store(true, Ordering::SeqCst);
        let first = tokio::spawn({
            let pager = pager.clone();
            async move { pager.load_more().await }
        });
        gated.entered.notified().await;

        let ignored = pager.load_more().await.unwrap();
        assert_eq!(ignored.phase, FeedPhase::LoadingMore);
        assert_eq!(ignored.cursor_offset, 10);
        assert_eq!(ignored.items.len(), 10);

        gated.hold.store(false, Ordering::SeqCst);
        gated.release.notify_one();
        let snap = first.await.unwrap().unwrap();
        assert_eq!(snap.cursor_offset, 20);
        assert_eq!(snap.items.len(), 20);
        assert_eq!(snap.phase, FeedPhase::Idle);
    }

    #[tokio::test]
    async fn test_mode_switch_drops_stale_page() {
        let inner = seeded(40, "u1");
        for n in 40..43 {
            inner.seed_video(video(n, "u2")).unwrap();
        }
        let (gated, pager) = gated_pager(inner);
        pager.load_initial(FeedMode::Global).await.unwrap();

        gated.hold.store(true, Ordering::SeqCst);
        let stale = tokio::spawn({
            let pager = pager.clone();
            async move { pager.load_more().await }
        });
        gated.entered.notified().await;

        let following = FeedMode::Following(vec![UserId::new("u2")]);
        let switched = pager.load_initial(following.clone()).await.unwrap();
        assert_eq!(switched.items.len(), 3);

        gated.hold.store(false, Ordering::SeqCst);
        gated.release.notify_one();
        let returned = stale.await.unwrap().unwrap();
        assert_eq!(returned, switched);
        let snap = pager.snapshot();
        assert_eq!(snap.mode, Some(following));
        assert_eq!(snap.items.len(), 3);
        assert_eq!(snap.cursor_offset, 3);
        assert!(snap.items.iter().all(|v| v.user_id.as_str() == "u2"));
    }

    #[tokio::test]
    async fn test_latest_initial_load_wins() {
        let inner = seeded(12, "u1");
        inner.seed_video(video(50, "u2")).unwrap();
        let (gated, pager) = gated_pager(inner);

        gated.hold.store(true, Ordering::SeqCst);
        let older = tokio::spawn({
            let pager = pager.clone();
            async move { pager.load_initial(FeedMode::Global).await }
        });
        gated.entered.notified().await;
        assert_eq!(pager.snapshot().phase, FeedPhase::LoadingInitial);

        let newer = pager
            .load_initial(FeedMode::Following(vec![UserId::new("u2")]))
            .await
            .unwrap();

        gated.hold.store(false, Ordering::SeqCst);
        gated.release.notify_one();
        older.await.unwrap().unwrap();

        let snap = pager.snapshot();
        assert_eq!(snap, newer);
        assert_eq!(snap.items.len(), 1);
        assert_eq!(snap.generation, 2);
    }
}
