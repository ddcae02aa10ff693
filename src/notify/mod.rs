pub mod dispatch;
pub mod routes;
pub mod store;

pub use dispatch::{NotificationDispatcher, NotifyError};
pub use store::{NewNotification, NotificationStore, SqliteNotificationStore, StoreError};
