//! Username search.

use tracing::debug;

use crate::backend::Backend;
use crate::error::Result;
use crate::models::{Profile, UserId};

/// Default cap on search hits.
pub const DEFAULT_SEARCH_LIMIT: usize = 25;

/// Profiles whose username contains `query` (case-insensitive), never
/// including `viewer`. A blank query returns nothing without a backend call.
pub async fn search_users(
    backend: &dyn Backend,
    query: &str,
    viewer: &UserId,
    limit: usize,
) -> Result<Vec<Profile>> {
    let query = query.trim();
    if query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }
    let hits = backend.search_profiles(query, viewer, limit).await?;
    debug!(query, hits = hits.len(), "search: users");
    Ok(hits)
}
