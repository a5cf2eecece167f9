use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::{DisplayConfig, ResourceConfig},
    domain::{MessageCategory, Payload},
    push::template,
};

pub const LED_BLINK_MILLIS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Sound {
    None,
    Default,
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Lights {
    None,
    Default,
    Custom {
        argb: Option<u32>,
        on_ms: u64,
        off_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Default,
    High,
}

/// Everything the notification surface needs to post one tray entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationDescriptor {
    pub category: MessageCategory,
    pub title: String,
    pub ticker: String,
    pub text: String,
    pub small_icon: String,
    pub large_icon: String,
    pub color: Option<u32>,
    pub sound: Sound,
    pub lights: Lights,
    pub vibration: Option<[u64; 3]>,
    pub priority: Priority,
    pub auto_cancel: bool,
    pub posted_at: DateTime<Utc>,
    /// Raw message handed back to the app when the entry is tapped.
    pub launch_data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    TrayDisabled,
    Foreground,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Show(NotificationDescriptor),
    Suppressed(SuppressReason),
}

pub struct NotificationRenderer<'a> {
    resources: &'a ResourceConfig,
    app_display_name: &'a str,
}

impl<'a> NotificationRenderer<'a> {
    pub fn new(resources: &'a ResourceConfig, app_display_name: &'a str) -> Self {
        Self {
            resources,
            app_display_name,
        }
    }

    pub fn render(
        &self,
        category: MessageCategory,
        payload: &Payload,
        config: &DisplayConfig,
        is_foreground: bool,
        now: DateTime<Utc>,
    ) -> RenderOutcome {
        if !config.show_in_tray {
            return RenderOutcome::Suppressed(SuppressReason::TrayDisabled);
        }
        if is_foreground {
            return RenderOutcome::Suppressed(SuppressReason::Foreground);
        }

        let title = template::resolve(
            payload,
            config.title_template.as_deref(),
            self.app_display_name,
        );
        let ticker = template::resolve(payload, config.ticker_template.as_deref(), "");
        let text = template::resolve(payload, config.text_template.as_deref(), "");

        let app_icon = &self.resources.app_icon;
        RenderOutcome::Show(NotificationDescriptor {
            category,
            title,
            ticker,
            text,
            small_icon: self.resources.small_icon.as_ref().unwrap_or(app_icon).clone(),
            large_icon: self.resources.large_icon.as_ref().unwrap_or(app_icon).clone(),
            color: self
                .resources
                .notification_color
                .as_deref()
                .and_then(parse_argb),
            sound: select_sound(config.use_sound, self.resources.custom_sound.as_deref()),
            lights: select_lights(config.led_color.as_deref()),
            vibration: vibration_pattern(config.vibration_millis),
            priority: Priority::High,
            auto_cancel: true,
            posted_at: now,
            launch_data: payload.to_json_string(),
        })
    }
}

fn select_sound(use_sound: bool, custom: Option<&str>) -> Sound {
    match (use_sound, custom) {
        (false, _) => Sound::None,
        (true, Some(name)) => Sound::Custom(name.to_string()),
        (true, None) => Sound::Default,
    }
}

fn select_lights(led_color: Option<&str>) -> Lights {
    match led_color {
        Some(color) if color.eq_ignore_ascii_case("DEFAULT") => Lights::Default,
        Some(color) if !color.is_empty() => Lights::Custom {
            argb: parse_argb(color),
            on_ms: LED_BLINK_MILLIS,
            off_ms: LED_BLINK_MILLIS,
        },
        _ => Lights::None,
    }
}

fn vibration_pattern(millis: u64) -> Option<[u64; 3]> {
    (millis > 0).then_some([0, millis, millis])
}

/// Parses `#AARRGGBB`. Only the low 32 bits are kept, so `#RRGGBB` has zero alpha.
pub fn parse_argb(text: &str) -> Option<u32> {
    let hex = text.replacen('#', "", 1);
    u64::from_str_radix(&hex, 16).ok().map(|value| value as u32)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn shown(outcome: RenderOutcome) -> NotificationDescriptor {
        match outcome {
            RenderOutcome::Show(descriptor) => descriptor,
            other => panic!("expected a descriptor, got {other:?}"),
        }
    }

    fn tray(config: DisplayConfig) -> DisplayConfig {
        DisplayConfig {
            show_in_tray: true,
            ..config
        }
    }

    #[test]
    fn app_name_is_the_title_fallback() {
        let resources = ResourceConfig::default();
        let renderer = NotificationRenderer::new(&resources, "MyApp");
        let config = tray(DisplayConfig {
            use_sound: false,
            vibration_millis: 0,
            title_template: Some(String::new()),
            text_template: Some("Hi".to_string()),
            ..Default::default()
        });

        let descriptor = shown(renderer.render(
            MessageCategory::DirectPush,
            &Payload::default(),
            &config,
            false,
            now(),
        ));
        assert_eq!(descriptor.title, "MyApp");
        assert_eq!(descriptor.text, "Hi");
        assert_eq!(descriptor.ticker, "");
        assert_eq!(descriptor.sound, Sound::None);
        assert_eq!(descriptor.vibration, None);
        assert_eq!(descriptor.lights, Lights::None);
        assert_eq!(descriptor.small_icon, "app_icon");
        assert_eq!(descriptor.color, None);
        assert_eq!(descriptor.launch_data, "{}");
    }

    #[test]
    fn suppressed_when_tray_disabled_or_foreground() {
        let resources = ResourceConfig::default();
        let renderer = NotificationRenderer::new(&resources, "MyApp");
        let payload = Payload::default();

        let hidden = DisplayConfig::default();
        assert_eq!(
            renderer.render(MessageCategory::PushToApp, &payload, &hidden, false, now()),
            RenderOutcome::Suppressed(SuppressReason::TrayDisabled)
        );
        assert_eq!(
            renderer.render(
                MessageCategory::PushToApp,
                &payload,
                &tray(DisplayConfig::default()),
                true,
                now()
            ),
            RenderOutcome::Suppressed(SuppressReason::Foreground)
        );
    }

    #[test]
    fn templates_resolve_against_the_message() {
        let resources = ResourceConfig::default();
        let renderer = NotificationRenderer::new(&resources, "MyApp");
        let payload = Payload::from_iter([("topic", json!("news")), ("msg", json!("Breaking"))]);
        let config = tray(DisplayConfig {
            title_template: Some("$.topic".to_string()),
            ticker_template: Some("$.missing".to_string()),
            text_template: Some("$.msg".to_string()),
            ..Default::default()
        });

        let descriptor = shown(renderer.render(
            MessageCategory::PushToUser,
            &payload,
            &config,
            false,
            now(),
        ));
        assert_eq!(descriptor.title, "news");
        assert_eq!(descriptor.ticker, "");
        assert_eq!(descriptor.text, "Breaking");
        assert_eq!(descriptor.category, MessageCategory::PushToUser);
    }

    #[test]
    fn sound_selection() {
        assert_eq!(select_sound(true, None), Sound::Default);
        assert_eq!(
            select_sound(true, Some("chime")),
            Sound::Custom("chime".to_string())
        );
        assert_eq!(select_sound(false, Some("chime")), Sound::None);
    }

    #[test]
    fn light_selection() {
        assert_eq!(select_lights(Some("default")), Lights::Default);
        assert_eq!(
            select_lights(Some("#FF00FF00")),
            Lights::Custom {
                argb: Some(0xFF00FF00),
                on_ms: 1000,
                off_ms: 1000
            }
        );
        assert_eq!(
            select_lights(Some("green")),
            Lights::Custom {
                argb: None,
                on_ms: 1000,
                off_ms: 1000
            }
        );
        assert_eq!(select_lights(Some("")), Lights::None);
        assert_eq!(select_lights(None), Lights::None);
    }

    #[test]
    fn vibration_is_one_on_off_cycle() {
        assert_eq!(vibration_pattern(300), Some([0, 300, 300]));
        assert_eq!(vibration_pattern(0), None);
    }

    #[test]
    fn argb_parsing() {
        assert_eq!(parse_argb("#80FF0000"), Some(0x80FF0000));
        assert_eq!(parse_argb("00FF00"), Some(0x0000FF00));
        assert_eq!(parse_argb("#zz"), None);
        assert_eq!(parse_argb(""), None);
    }

    #[test]
    fn configured_icons_and_tint_are_used() {
        let resources = ResourceConfig {
            small_icon: Some("ic_small".to_string()),
            large_icon: None,
            app_icon: "ic_app".to_string(),
            notification_color: Some("#FF112233".to_string()),
            custom_sound: Some("ding".to_string()),
        };
        let renderer = NotificationRenderer::new(&resources, "MyApp");
        let config = tray(DisplayConfig {
            use_sound: true,
            vibration_millis: 100,
            ..Default::default()
        });
        let descriptor = shown(renderer.render(
            MessageCategory::DirectPush,
            &Payload::default(),
            &config,
            false,
            now(),
        ));
        assert_eq!(descriptor.small_icon, "ic_small");
        assert_eq!(descriptor.large_icon, "ic_app");
        assert_eq!(descriptor.color, Some(0xFF112233));
        assert_eq!(descriptor.sound, Sound::Custom("ding".to_string()));
        assert_eq!(descriptor.vibration, Some([0, 100, 100]));
        assert_eq!(descriptor.priority, Priority::High);
        assert!(descriptor.auto_cancel);
    }
}
