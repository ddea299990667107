use std::sync::Arc;

use anyhow::anyhow;
use tracing::error;

use murmur_db::Database;

use crate::error::ApiError;
use crate::recorder::VoiceRecorder;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub recorder: VoiceRecorder,
    pub max_upload_bytes: usize,
}

/// Run a blocking DB call off the async runtime.
pub async fn run_db<F, T>(db: &Arc<Database>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!("database task failed: {}", e))
        })?
        .map_err(ApiError::Internal)
}
