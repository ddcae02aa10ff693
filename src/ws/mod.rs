pub mod actor;
pub mod handler;
pub mod protocol;

use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push frames to a specific
/// client; the connection's writer task owns the receiving half.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;
