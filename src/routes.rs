use axum::{middleware, Router};

use crate::auth::middleware::JwtSecret;
use crate::notify::routes as notify_routes;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Puts the signing secret into request extensions, where the Claims
/// extractor picks it up without being tied to the state type.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Assemble the relay's full surface: the notification REST group, the
/// WebSocket endpoint and a health probe.
pub fn build_router(state: AppState) -> Router {
    // Notification lifecycle; the Claims extractor enforces JWT auth
    let notification_routes = Router::new()
        .route(
            "/api/notifications",
            axum::routing::post(notify_routes::create_notification),
        )
        .route(
            "/api/notifications",
            axum::routing::get(notify_routes::list_notifications),
        )
        .route(
            "/api/notifications/{id}/seen",
            axum::routing::post(notify_routes::mark_notification_seen),
        )
        .route(
            "/api/notifications/{id}",
            axum::routing::delete(notify_routes::delete_notification),
        );

    // WebSocket endpoint (auth via query param, not JWT header)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(notification_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
