use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::{
    bridge::{dispatch, HostBridge},
    config::AppConfig,
    domain::{MessageCategory, Payload},
    push::{
        classifier::classify,
        registrar::{PushRegistrar, RegistrationError},
        renderer::{NotificationDescriptor, NotificationRenderer, RenderOutcome},
        store::{LastMessageStore, StoreError},
    },
};

pub const DEFAULT_LISTENER: &str = "KiiPushPlugin";
pub const PUSH_RECEIVED_METHOD: &str = "OnPushNotificationsReceived";
pub const REGISTER_SUCCEEDED_METHOD: &str = "OnRegisterPushSucceeded";
pub const REGISTER_FAILED_METHOD: &str = "OnRegisterPushFailed";
pub const UNREGISTER_SUCCEEDED_METHOD: &str = "OnUnregisterPushSucceeded";
pub const UNREGISTER_FAILED_METHOD: &str = "OnUnregisterPushFailed";
pub const REGISTRATION_ATTEMPTS: usize = 3;

/// The platform notification tray.
pub trait NotificationSurface: Send + Sync {
    fn notify(&self, descriptor: &NotificationDescriptor);
}

/// Decides what happens to a received message before it reaches the engine.
pub trait PushHandler: Send + Sync {
    /// Returns true when the message should be forwarded to the engine.
    fn on_push_message(
        &self,
        category: MessageCategory,
        payload: &Payload,
        is_foreground: bool,
    ) -> bool;
}

/// Shows messages in the tray according to the per-category display config
/// and always forwards them.
pub struct TrayPushHandler {
    config: Arc<AppConfig>,
    surface: Arc<dyn NotificationSurface>,
}

impl TrayPushHandler {
    pub fn new(config: Arc<AppConfig>, surface: Arc<dyn NotificationSurface>) -> Self {
        Self { config, surface }
    }
}

impl PushHandler for TrayPushHandler {
    fn on_push_message(
        &self,
        category: MessageCategory,
        payload: &Payload,
        is_foreground: bool,
    ) -> bool {
        let display_config = self.config.push.for_category(category);
        tracing::debug!(
            target: "push",
            category = category.label(),
            show_in_tray = display_config.show_in_tray,
            use_sound = display_config.use_sound,
            led_color = display_config.led_color.as_deref(),
            vibration_millis = display_config.vibration_millis,
            "display config"
        );

        let renderer =
            NotificationRenderer::new(&self.config.resources, &self.config.app_display_name);
        match renderer.render(category, payload, display_config, is_foreground, Utc::now()) {
            RenderOutcome::Show(descriptor) => {
                tracing::debug!(target: "push", title = %descriptor.title, "showing notification");
                self.surface.notify(&descriptor);
            }
            RenderOutcome::Suppressed(reason) => {
                tracing::debug!(target: "push", ?reason, "notification suppressed");
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandledMessage {
    pub category: MessageCategory,
    pub forwarded: bool,
}

pub struct PushPlugin {
    listener: RwLock<Option<String>>,
    sender_id: RwLock<Option<String>>,
    host: Arc<dyn HostBridge>,
    handler: Arc<dyn PushHandler>,
    store: Arc<dyn LastMessageStore>,
    registrar: Arc<dyn PushRegistrar>,
}

impl PushPlugin {
    pub fn new(
        listener: Option<String>,
        sender_id: Option<String>,
        host: Arc<dyn HostBridge>,
        handler: Arc<dyn PushHandler>,
        store: Arc<dyn LastMessageStore>,
        registrar: Arc<dyn PushRegistrar>,
    ) -> Self {
        Self {
            listener: RwLock::new(listener),
            sender_id: RwLock::new(sender_id),
            host,
            handler,
            store,
            registrar,
        }
    }

    /// Engine object receiving push callbacks.
    pub fn listener_object(&self) -> String {
        match self.listener.read().as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_LISTENER.to_string(),
        }
    }

    pub fn set_listener_object(&self, name: impl Into<String>) {
        let name = name.into();
        tracing::debug!(target: "push", listener = %name, "listener object set");
        *self.listener.write() = Some(name);
    }

    /// Sender id used by registrations started after this call.
    pub fn set_sender_id(&self, sender_id: impl Into<String>) {
        let sender_id = sender_id.into();
        tracing::debug!(target: "push", sender_id = %sender_id, "sender id set");
        *self.sender_id.write() = Some(sender_id);
    }

    pub fn handle_message(&self, payload: &Payload, is_foreground: bool) -> HandledMessage {
        let category = classify(payload);
        tracing::info!(
            target: "push",
            category = category.label(),
            fields = payload.len(),
            is_foreground,
            "push message received"
        );

        let forwarded = self
            .handler
            .on_push_message(category, payload, is_foreground);
        if forwarded {
            self.forward(payload);
        }
        HandledMessage {
            category,
            forwarded,
        }
    }

    fn forward(&self, payload: &Payload) {
        let message = payload.to_json_string();
        if let Err(err) = self.store.save(&message) {
            tracing::warn!(target: "push", error = %err, "failed to persist last message");
        }
        dispatch(
            self.host.as_ref(),
            &self.listener_object(),
            PUSH_RECEIVED_METHOD,
            &message,
        );
    }

    /// Returns the last forwarded message and clears it.
    pub fn last_message(&self) -> Result<Option<String>, StoreError> {
        self.store.take()
    }

    /// Registers in the background, reporting the outcome to the listener object.
    pub fn register(self: &Arc<Self>) -> JoinHandle<()> {
        let plugin = self.clone();
        let listener = self.listener_object();
        let sender_id = self.sender_id.read().clone().unwrap_or_default();
        tokio::spawn(async move {
            match plugin.register_with_retry(&sender_id).await {
                Ok(registration_id) => dispatch(
                    plugin.host.as_ref(),
                    &listener,
                    REGISTER_SUCCEEDED_METHOD,
                    &registration_id,
                ),
                Err(message) => dispatch(
                    plugin.host.as_ref(),
                    &listener,
                    REGISTER_FAILED_METHOD,
                    &message,
                ),
            }
        })
    }

    async fn register_with_retry(&self, sender_id: &str) -> Result<String, String> {
        let mut last_error = String::new();
        for attempt in 1..=REGISTRATION_ATTEMPTS {
            let err = match self.registrar.register(sender_id).await {
                Ok(registration_id) if !registration_id.is_empty() => {
                    tracing::info!(target: "registration", attempt, "push registration succeeded");
                    return Ok(registration_id);
                }
                Ok(_) => RegistrationError::EmptyRegistrationId,
                Err(err) => err,
            };
            tracing::warn!(
                target: "registration",
                attempt,
                error = %err,
                "push registration failed"
            );
            last_error = err.to_string();
        }
        Err(last_error)
    }

    pub fn unregister(self: &Arc<Self>) -> JoinHandle<()> {
        let plugin = self.clone();
        let listener = self.listener_object();
        tokio::spawn(async move {
            match plugin.registrar.unregister().await {
                Ok(()) => {
                    tracing::info!(target: "registration", "push unregistration succeeded");
                    dispatch(
                        plugin.host.as_ref(),
                        &listener,
                        UNREGISTER_SUCCEEDED_METHOD,
                        "",
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        target: "registration",
                        error = %err,
                        "push unregistration failed"
                    );
                    dispatch(
                        plugin.host.as_ref(),
                        &listener,
                        UNREGISTER_FAILED_METHOD,
                        &err.to_string(),
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::{
        bridge::BridgeError,
        config::{AppConfig, DisplayConfig},
        push::store::FileMessageStore,
    };

    #[derive(Default)]
    struct RecordingHost {
        messages: Mutex<Vec<(String, String, String)>>,
    }

    impl HostBridge for RecordingHost {
        fn send_message(
            &self,
            object: &str,
            method: &str,
            message: &str,
        ) -> Result<(), BridgeError> {
            self.messages
                .lock()
                .push((object.to_string(), method.to_string(), message.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTray {
        shown: Mutex<Vec<NotificationDescriptor>>,
    }

    impl NotificationSurface for RecordingTray {
        fn notify(&self, descriptor: &NotificationDescriptor) {
            self.shown.lock().push(descriptor.clone());
        }
    }

    struct ScriptedRegistrar {
        replies: Mutex<VecDeque<Result<String, RegistrationError>>>,
        attempts: AtomicUsize,
        sender_ids: Mutex<Vec<String>>,
    }

    impl ScriptedRegistrar {
        fn new(replies: Vec<Result<String, RegistrationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                attempts: AtomicUsize::new(0),
                sender_ids: Mutex::new(Vec::new()),
            }
        }
    }

    impl PushRegistrar for ScriptedRegistrar {
        fn register<'a>(
            &'a self,
            sender_id: &'a str,
        ) -> BoxFuture<'a, Result<String, RegistrationError>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.sender_ids.lock().push(sender_id.to_string());
            let reply = self
                .replies
                .lock()
                .pop_front()
                .unwrap_or(Err(RegistrationError::NotConfigured));
            Box::pin(async move { reply })
        }

        fn unregister(&self) -> BoxFuture<'_, Result<(), RegistrationError>> {
            Box::pin(async { Err(RegistrationError::NotConfigured) })
        }
    }

    fn test_config() -> AppConfig {
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        config.app_display_name = "MyApp".to_string();
        config.push.direct_push = DisplayConfig {
            show_in_tray: true,
            text_template: Some("$.message".to_string()),
            ..Default::default()
        };
        config
    }

    struct Fixture {
        plugin: Arc<PushPlugin>,
        host: Arc<RecordingHost>,
        tray: Arc<RecordingTray>,
        registrar: Arc<ScriptedRegistrar>,
        _dir: tempfile::TempDir,
    }

    fn fixture(replies: Vec<Result<String, RegistrationError>>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(RecordingHost::default());
        let tray = Arc::new(RecordingTray::default());
        let registrar = Arc::new(ScriptedRegistrar::new(replies));
        let handler = Arc::new(TrayPushHandler::new(Arc::new(test_config()), tray.clone()));
        let store = Arc::new(FileMessageStore::new(dir.path().join("last_message.json")));
        let plugin = Arc::new(PushPlugin::new(
            None,
            Some("sender-1".to_string()),
            host.clone(),
            handler,
            store,
            registrar.clone(),
        ));
        Fixture {
            plugin,
            host,
            tray,
            registrar,
            _dir: dir,
        }
    }

    #[test]
    fn direct_push_is_shown_and_forwarded() {
        let f = fixture(vec![]);
        let payload = Payload::from_iter([("message", json!("Hi there"))]);

        let handled = f.plugin.handle_message(&payload, false);
        assert_eq!(handled.category, MessageCategory::DirectPush);
        assert!(handled.forwarded);

        let shown = f.tray.shown.lock();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "MyApp");
        assert_eq!(shown[0].text, "Hi there");

        let messages = f.host.messages.lock();
        assert_eq!(
            messages[0],
            (
                DEFAULT_LISTENER.to_string(),
                PUSH_RECEIVED_METHOD.to_string(),
                r#"{"message":"Hi there"}"#.to_string()
            )
        );
    }

    #[test]
    fn suppressed_messages_are_still_forwarded() {
        let f = fixture(vec![]);
        f.plugin.set_listener_object("GameRoot");
        let payload = Payload::from_iter([("topic", json!("news"))]);

        let handled = f.plugin.handle_message(&payload, false);
        assert_eq!(handled.category, MessageCategory::PushToUser);
        assert!(f.tray.shown.lock().is_empty());
        assert_eq!(f.host.messages.lock()[0].0, "GameRoot");

        f.plugin.handle_message(&Payload::default(), true);
        assert!(f.tray.shown.lock().is_empty());
        assert_eq!(f.host.messages.lock().len(), 2);
    }

    #[test]
    fn last_message_is_returned_once() {
        let f = fixture(vec![]);
        f.plugin
            .handle_message(&Payload::from_iter([("message", json!("first"))]), true);
        f.plugin
            .handle_message(&Payload::from_iter([("message", json!("second"))]), true);

        assert_eq!(
            f.plugin.last_message().unwrap().as_deref(),
            Some(r#"{"message":"second"}"#)
        );
        assert_eq!(f.plugin.last_message().unwrap(), None);
    }

    #[test]
    fn empty_listener_name_uses_default() {
        let f = fixture(vec![]);
        f.plugin.set_listener_object("");
        assert_eq!(f.plugin.listener_object(), DEFAULT_LISTENER);
    }

    #[tokio::test]
    async fn registration_retries_until_an_id_arrives() {
        let f = fixture(vec![
            Err(RegistrationError::NotConfigured),
            Ok(String::new()),
            Ok("reg-42".to_string()),
        ]);
        f.plugin.register().await.unwrap();

        assert_eq!(f.registrar.attempts.load(Ordering::SeqCst), 3);
        let messages = f.host.messages.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, REGISTER_SUCCEEDED_METHOD);
        assert_eq!(messages[0].2, "reg-42");
    }

    #[tokio::test]
    async fn registration_gives_up_after_three_attempts() {
        let f = fixture(vec![
            Err(RegistrationError::NotConfigured),
            Err(RegistrationError::NotConfigured),
            Err(RegistrationError::MissingSenderId),
            Ok("too-late".to_string()),
        ]);
        f.plugin.register().await.unwrap();

        assert_eq!(f.registrar.attempts.load(Ordering::SeqCst), 3);
        let messages = f.host.messages.lock();
        assert_eq!(messages[0].1, REGISTER_FAILED_METHOD);
        assert_eq!(messages[0].2, RegistrationError::MissingSenderId.to_string());
    }

    #[tokio::test]
    async fn registration_uses_the_latest_sender_id() {
        let f = fixture(vec![Ok("reg-1".to_string()), Ok("reg-2".to_string())]);
        f.plugin.register().await.unwrap();
        f.plugin.set_sender_id("sender-2");
        f.plugin.register().await.unwrap();

        assert_eq!(*f.registrar.sender_ids.lock(), ["sender-1", "sender-2"]);
        let messages = f.host.messages.lock();
        assert_eq!(messages[1].1, REGISTER_SUCCEEDED_METHOD);
        assert_eq!(messages[1].2, "reg-2");
    }

    #[tokio::test]
    async fn unregister_failure_is_reported() {
        let f = fixture(vec![]);
        f.plugin.unregister().await.unwrap();
        let messages = f.host.messages.lock();
        assert_eq!(messages[0].1, UNREGISTER_FAILED_METHOD);
        assert_eq!(messages[0].2, RegistrationError::NotConfigured.to_string());
    }
}
