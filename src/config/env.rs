use std::time::Duration;

use thiserror::Error;

use crate::domain::MessageCategory;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listener_object: Option<String>,
    pub sender_id: Option<String>,
    pub registration_endpoint: Option<String>,
    /// Upper bound for a single registration or unregistration request.
    pub registration_timeout: Duration,
    pub app_display_name: String,
    pub push: PushConfig,
    pub resources: ResourceConfig,
    pub auth: AuthConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

/// Tray behaviour for each message category.
#[derive(Debug, Clone, Default)]
pub struct PushConfig {
    pub push_to_app: DisplayConfig,
    pub push_to_user: DisplayConfig,
    pub direct_push: DisplayConfig,
}

impl PushConfig {
    pub fn for_category(&self, category: MessageCategory) -> &DisplayConfig {
        match category {
            MessageCategory::PushToApp => &self.push_to_app,
            MessageCategory::PushToUser => &self.push_to_user,
            MessageCategory::DirectPush => &self.direct_push,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayConfig {
    pub show_in_tray: bool,
    pub use_sound: bool,
    /// `DEFAULT` or `#AARRGGBB`.
    pub led_color: Option<String>,
    /// 0 disables vibration.
    pub vibration_millis: u64,
    /// Literal text or a `$.path` query.
    pub title_template: Option<String>,
    pub ticker_template: Option<String>,
    pub text_template: Option<String>,
}

/// Host resources referenced by rendered notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    pub small_icon: Option<String>,
    pub large_icon: Option<String>,
    pub app_icon: String,
    pub notification_color: Option<String>,
    pub custom_sound: Option<String>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            small_icon: None,
            large_icon: None,
            app_icon: "app_icon".to_string(),
            notification_color: None,
            custom_sound: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub callback_object: Option<String>,
    pub user_agent: Option<String>,
    pub dialog: DialogResources,
}

/// UI resources the login dialog cannot be built without.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogResources {
    pub layout: Option<String>,
    pub web_view: Option<String>,
    pub cancel_button: Option<String>,
}

impl Default for DialogResources {
    fn default() -> Self {
        Self {
            layout: Some("auth_dialog".to_string()),
            web_view: Some("auth_dialog_webview".to_string()),
            cancel_button: Some("auth_dialog_button".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}
