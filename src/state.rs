use std::sync::Arc;

use crate::db::DbPool;
use crate::notify::NotificationDispatcher;
use crate::relay::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Live connections and the logical addresses they answer to
    pub registry: Arc<ConnectionRegistry>,
    /// Notification persistence plus best-effort live push
    pub notifier: Arc<NotificationDispatcher>,
}
