use axum::http::StatusCode;
use std::fmt;
use std::sync::Arc;

use crate::db::models::Notification;
use crate::notify::store::{NewNotification, NotificationStore, StoreError};
use crate::relay::{deliver, Address, ConnectionRegistry, RouteOutcome};
use crate::ws::protocol::{self, NotificationEvent};

/// Failure taxonomy for the notification surface.
#[derive(Debug)]
pub enum NotifyError {
    /// A required field was missing or empty. No write happened.
    Validation(&'static str),
    /// The record does not exist for this user.
    NotFound,
    /// The persistence write failed. No push was attempted.
    Storage(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Validation(msg) => write!(f, "{}", msg),
            NotifyError::NotFound => write!(f, "notification not found"),
            NotifyError::Storage(msg) => write!(f, "storage failure: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<StoreError> for NotifyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => NotifyError::NotFound,
            StoreError::Backend(msg) => NotifyError::Storage(msg),
        }
    }
}

impl NotifyError {
    /// HTTP status for the REST boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            NotifyError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NotifyError::NotFound => StatusCode::NOT_FOUND,
            NotifyError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Combines authoritative persistence with best-effort live push.
///
/// Storage decides the outcome: a record that could not be pushed is still
/// served by the REST read path once the user looks. A failed push is a
/// debug-level event, never an error to the creator.
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    registry: Arc<ConnectionRegistry>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn NotificationStore>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { store, registry }
    }

    /// Create a notification: validate, persist, then push the projection
    /// to every connection the target user has open. Push happens only
    /// here, exactly once per record, after the write succeeded.
    pub async fn create(&self, new: NewNotification) -> Result<Notification, NotifyError> {
        if new.user_id.trim().is_empty() {
            return Err(NotifyError::Validation("user_id must not be empty"));
        }
        if new.message.trim().is_empty() {
            return Err(NotifyError::Validation("message must not be empty"));
        }

        let record = self.store.save(new).await?;

        match protocol::notification_text(&NotificationEvent::from(&record)) {
            Ok(text) => {
                let target = Address::User(record.user_id.clone());
                match deliver(&self.registry, &target, text) {
                    RouteOutcome::Delivered(n) => {
                        tracing::debug!(
                            id = %record.id,
                            user_id = %record.user_id,
                            connections = n,
                            "Notification pushed"
                        );
                    }
                    RouteOutcome::Miss => {
                        tracing::debug!(
                            id = %record.id,
                            user_id = %record.user_id,
                            "Notification stored, target offline"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    id = %record.id,
                    error = %e,
                    "Failed to serialize notification event"
                );
            }
        }

        Ok(record)
    }

    /// Notifications for a user, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Notification>, NotifyError> {
        Ok(self.store.list_for_user(user_id).await?)
    }

    /// Acknowledge a notification. Never emits a frame.
    pub async fn mark_seen(&self, user_id: &str, id: &str) -> Result<(), NotifyError> {
        Ok(self.store.mark_seen(user_id, id).await?)
    }

    /// Hard-delete a notification. Never emits a frame.
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), NotifyError> {
        Ok(self.store.delete(user_id, id).await?)
    }
}
