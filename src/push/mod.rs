pub mod classifier;
pub mod plugin;
pub mod registrar;
pub mod renderer;
pub mod store;
pub mod template;

pub use classifier::classify;
pub use plugin::{
    HandledMessage, NotificationSurface, PushHandler, PushPlugin, TrayPushHandler,
    DEFAULT_LISTENER, PUSH_RECEIVED_METHOD, REGISTRATION_ATTEMPTS,
};
pub use registrar::{HttpRegistrar, PushRegistrar, RegistrationError};
pub use renderer::{NotificationDescriptor, NotificationRenderer, RenderOutcome};
pub use store::{FileMessageStore, LastMessageStore, StoreError};
