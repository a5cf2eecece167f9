use std::{env, time::Duration};

use super::env::{
    AppConfig, AuthConfig, ConfigError, DialogResources, DirectoryConfig, DisplayConfig,
    LoggingConfig, PushConfig, ResourceConfig,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listener_object = non_empty(&lookup, "PUSH_LISTENER_OBJECT");
        let sender_id = non_empty(&lookup, "PUSH_SENDER_ID");
        let registration_endpoint = non_empty(&lookup, "PUSH_REGISTRATION_ENDPOINT");
        let registration_timeout = Duration::from_millis(parse_millis(
            &lookup,
            "PUSH_REGISTRATION_TIMEOUT",
            10_000,
        )?);
        let app_display_name = non_empty(&lookup, "APP_DISPLAY_NAME")
            .unwrap_or_else(|| "Missing app name".to_string());

        let push = PushConfig {
            push_to_app: display_config(&lookup, "PUSH_APP_")?,
            push_to_user: display_config(&lookup, "PUSH_USER_")?,
            direct_push: display_config(&lookup, "PUSH_DIRECT_")?,
        };

        let resources = ResourceConfig {
            small_icon: non_empty(&lookup, "NOTIFICATION_SMALL_ICON"),
            large_icon: non_empty(&lookup, "NOTIFICATION_LARGE_ICON"),
            app_icon: non_empty(&lookup, "NOTIFICATION_APP_ICON")
                .unwrap_or_else(|| "app_icon".to_string()),
            notification_color: non_empty(&lookup, "NOTIFICATION_COLOR"),
            custom_sound: non_empty(&lookup, "NOTIFICATION_SOUND"),
        };

        let defaults = DialogResources::default();
        let auth = AuthConfig {
            callback_object: non_empty(&lookup, "AUTH_CALLBACK_OBJECT"),
            user_agent: non_empty(&lookup, "AUTH_USER_AGENT"),
            dialog: DialogResources {
                layout: resource(&lookup, "AUTH_DIALOG_LAYOUT", defaults.layout),
                web_view: resource(&lookup, "AUTH_DIALOG_WEBVIEW", defaults.web_view),
                cancel_button: resource(&lookup, "AUTH_DIALOG_BUTTON", defaults.cancel_button),
            },
        };

        let directories = DirectoryConfig {
            logs_dir: lookup("LOGS_DIR").unwrap_or_else(|| "logs".to_string()),
            data_dir: lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()),
        };

        let logging = LoggingConfig {
            level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        Ok(Self {
            listener_object,
            sender_id,
            registration_endpoint,
            registration_timeout,
            app_display_name,
            push,
            resources,
            auth,
            directories,
            logging,
        })
    }
}

fn display_config<F>(lookup: &F, prefix: &str) -> Result<DisplayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let key = |name: &str| format!("{prefix}{name}");
    Ok(DisplayConfig {
        show_in_tray: parse_bool(lookup, &key("SHOW_IN_NOTIFICATION_AREA"))?,
        use_sound: parse_bool(lookup, &key("USE_SOUND"))?,
        led_color: non_empty(lookup, &key("LED_COLOR")),
        vibration_millis: parse_millis(lookup, &key("VIBRATION_MILLISECONDS"), 0)?,
        title_template: non_empty(lookup, &key("NOTIFICATION_TITLE")),
        ticker_template: non_empty(lookup, &key("NOTIFICATION_TICKER")),
        text_template: non_empty(lookup, &key("NOTIFICATION_TEXT")),
    })
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.is_empty())
}

// Unset keeps the default; set-but-empty means the resource is absent.
fn resource<F>(lookup: &F, key: &str, default: Option<String>) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(value),
        None => default,
    }
}

fn parse_bool<F>(lookup: &F, key: &str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        None => Ok(false),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                value,
            }),
        },
    }
}

fn parse_millis<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        None => Ok(default),
        Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}
