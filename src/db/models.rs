/// Database row types for all tables.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.

/// Notification record in the notifications table.
/// Ids are UUIDv7 strings; created_at is RFC 3339 UTC.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub interest_id: Option<String>,
    pub event_id: Option<String>,
    pub is_seen: bool,
    pub created_at: String,
}
