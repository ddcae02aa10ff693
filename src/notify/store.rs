use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use uuid::Uuid;

use crate::db::models::Notification;
use crate::db::DbPool;

/// Storage failure taxonomy for notification records.
#[derive(Debug)]
pub enum StoreError {
    /// No record with that id belongs to the user.
    NotFound,
    /// The backend rejected or lost the operation.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "notification not found"),
            StoreError::Backend(msg) => write!(f, "storage failure: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Fields for a new notification; the store assigns id and created_at.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub message: String,
    pub interest_id: Option<String>,
    pub event_id: Option<String>,
}

/// Durable store for notification records.
///
/// The live push is a projection of what this trait persisted, never the
/// other way around: a record that exists but was never pushed is correct,
/// a pushed frame without a record is a bug.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new record and return it with id and timestamp assigned.
    async fn save(&self, new: NewNotification) -> Result<Notification, StoreError>;

    /// All records addressed to a user, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, StoreError>;

    /// Mark one of the user's records as seen.
    async fn mark_seen(&self, user_id: &str, id: &str) -> Result<(), StoreError>;

    /// Hard-delete one of the user's records.
    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError>;
}

/// SQLite-backed store over the shared connection pool. All statements run
/// on the blocking pool; ownership is enforced in the WHERE clause so a
/// caller can never touch another user's records.
#[derive(Clone)]
pub struct SqliteNotificationStore {
    db: DbPool,
}

impl SqliteNotificationStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn save(&self, new: NewNotification) -> Result<Notification, StoreError> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| StoreError::Backend(format!("DB lock: {}", e)))?;

            let record = Notification {
                id: Uuid::now_v7().to_string(),
                user_id: new.user_id,
                message: new.message,
                interest_id: new.interest_id,
                event_id: new.event_id,
                is_seen: false,
                created_at: Utc::now().to_rfc3339(),
            };

            conn.execute(
                "INSERT INTO notifications
                 (id, user_id, message, interest_id, event_id, is_seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.id,
                    record.user_id,
                    record.message,
                    record.interest_id,
                    record.event_id,
                    record.is_seen,
                    record.created_at,
                ],
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;

            Ok(record)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join: {}", e)))?
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        let db = self.db.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| StoreError::Backend(format!("DB lock: {}", e)))?;

            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, message, interest_id, event_id, is_seen, created_at
                     FROM notifications
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id], |row| {
                    Ok(Notification {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message: row.get(2)?,
                        interest_id: row.get(3)?,
                        event_id: row.get(4)?,
                        is_seen: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })
                .map_err(|e| StoreError::Backend(e.to_string()))?
                .filter_map(|r| r.ok())
                .collect();

            Ok(rows)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join: {}", e)))?
    }

    async fn mark_seen(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let db = self.db.clone();
        let user_id = user_id.to_string();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| StoreError::Backend(format!("DB lock: {}", e)))?;

            let changed = conn
                .execute(
                    "UPDATE notifications SET is_seen = 1 WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![id, user_id],
                )
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join: {}", e)))?
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let db = self.db.clone();
        let user_id = user_id.to_string();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| StoreError::Backend(format!("DB lock: {}", e)))?;

            let changed = conn
                .execute(
                    "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![id, user_id],
                )
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("task join: {}", e)))?
    }
}
