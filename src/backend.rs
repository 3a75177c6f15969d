//! Chooses and opens the configured [`Backend`].

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use practice_room_core::backend::Backend;

use crate::config::{BackendKind, Config};
use crate::rest_backend::RestBackend;
use crate::sqlite_backend::SqliteBackend;

pub async fn open_backend(config: &Config) -> Result<Arc<dyn Backend>> {
    match config.backend.kind {
        BackendKind::Sqlite => {
            let backend = SqliteBackend::open(config).await?;
            info!(path = %config.db.path.display(), "backend: sqlite");
            Ok(Arc::new(backend))
        }
        BackendKind::Rest => {
            let rest = config
                .rest
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("backend.kind = \"rest\" needs a [rest] section"))?;
            let backend = RestBackend::from_config(rest)?;
            info!(url = %rest.url, "backend: rest");
            Ok(Arc::new(backend))
        }
    }
}
