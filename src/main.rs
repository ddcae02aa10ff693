mod auth;
mod config;
mod db;
mod notify;
mod relay;
mod routes;
mod signaling;
mod state;
mod ws;

use std::sync::Arc;
use tokio::net::TcpListener;

use config::{generate_config_template, Config};
use notify::{NotificationDispatcher, SqliteNotificationStore};
use relay::ConnectionRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "kindred_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "kindred_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("Kindred relay server v{} starting", env!("CARGO_PKG_VERSION"));

    let db = db::init_db(&config.data_dir)?;
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    // One registry per process, shared by the WS actors, the signaling relay
    // and the notification dispatcher.
    let registry = Arc::new(ConnectionRegistry::new());
    let store = Arc::new(SqliteNotificationStore::new(db.clone()));
    let notifier = Arc::new(NotificationDispatcher::new(store, registry.clone()));

    let app_state = state::AppState {
        db,
        jwt_secret,
        registry,
        notifier,
    };

    let app = routes::build_router(app_state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
