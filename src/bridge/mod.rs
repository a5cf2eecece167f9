pub mod host;
pub mod stdio;
pub mod ui;

pub use host::{dispatch, BridgeError, HostBridge};
pub use stdio::{Event, JsonLineWriter, StdioAuthSurface, StdioHost, StdioNotificationSurface};
pub use ui::UiThread;
