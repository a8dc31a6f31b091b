use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::AuthClient;
use crate::chat::ChatClient;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::storage::BlobStore;

/// Shared application state injected into all route handlers via Axum
/// extractors. Every collaborator is constructed once at the composition
/// root; nothing lives in module-level globals.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub pipeline: Arc<Pipeline>,
    pub auth: Arc<AuthClient>,
    pub chat: Arc<ChatClient>,
    /// Blob store used directly for avatars; the pipeline holds its own
    /// handle for transient CV bytes.
    pub blobs: Arc<dyn BlobStore>,
    pub config: Config,
}
