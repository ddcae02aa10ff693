use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::db::models::Notification;
use crate::notify::store::NewNotification;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub interest_id: Option<String>,
    pub event_id: Option<String>,
    pub is_seen: bool,
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            message: n.message,
            interest_id: n.interest_id,
            event_id: n.event_id,
            is_seen: n.is_seen,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub interest_id: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
}

/// POST /api/notifications -- Persist a notification, then push it to the
/// target user's live connections. JWT auth required.
/// Only validation or storage failures reach the caller; a push to an
/// offline user is still a 201.
pub async fn create_notification(
    State(state): State<AppState>,
    _claims: Claims,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationResponse>), (StatusCode, String)> {
    let record = state
        .notifier
        .create(NewNotification {
            user_id: req.user_id,
            message: req.message,
            interest_id: req.interest_id,
            event_id: req.event_id,
        })
        .await
        .map_err(|e| (e.status(), e.to_string()))?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /api/notifications -- The authenticated user's notifications, newest
/// first. JWT auth required. This is the catch-up path for anything missed
/// while offline.
pub async fn list_notifications(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<NotificationResponse>>, (StatusCode, String)> {
    let records = state
        .notifier
        .list_for_user(&claims.sub)
        .await
        .map_err(|e| (e.status(), e.to_string()))?;

    Ok(Json(records.into_iter().map(NotificationResponse::from).collect()))
}

/// POST /api/notifications/{id}/seen -- Mark one of the caller's
/// notifications as seen. JWT auth required. Emits no frame.
pub async fn mark_notification_seen(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .notifier
        .mark_seen(&claims.sub, &id)
        .await
        .map_err(|e| (e.status(), e.to_string()))?;

    Ok(StatusCode::OK)
}

/// DELETE /api/notifications/{id} -- Hard-delete one of the caller's
/// notifications. JWT auth required. Emits no frame.
pub async fn delete_notification(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .notifier
        .delete(&claims.sub, &id)
        .await
        .map_err(|e| (e.status(), e.to_string()))?;

    Ok(StatusCode::OK)
}
