pub mod db;
pub mod events;

pub use db::DbAdapter;
pub use events::{run_notification_listener, BroadcastEventPublisher};
