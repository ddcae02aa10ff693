pub mod migrations;
pub mod models;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared handle to the single rusqlite connection. Statements run on the
/// blocking pool (`spawn_blocking`) and take the mutex there; async code
/// never holds it across an await.
pub type DbPool = Arc<Mutex<Connection>>;

/// Open (or create) `kindred.db` under the data directory and bring the
/// schema to the latest migration.
pub fn init_db(data_dir: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = Path::new(data_dir).join("kindred.db");
    let mut conn = Connection::open(&db_path)?;

    // WAL keeps readers unblocked while a write is in flight
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    migrations::migrations().to_latest(&mut conn)?;

    tracing::info!("Database ready at {}", db_path.display());

    Ok(Arc::new(Mutex::new(conn)))
}
