use std::{
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    auth::{AuthSurface, SessionId},
    bridge::host::{BridgeError, HostBridge},
    push::{NotificationDescriptor, NotificationSurface},
};

/// Everything the bridge reports back over stdout, one JSON object per line.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event<'a> {
    HostMessage {
        object: &'a str,
        method: &'a str,
        message: &'a str,
    },
    Notification {
        descriptor: &'a NotificationDescriptor,
    },
    LastMessage {
        message: Option<&'a str>,
    },
    AuthStarted {
        session: SessionId,
    },
    AuthLoad {
        session: SessionId,
        url: &'a str,
        user_agent: Option<&'a str>,
    },
    AuthStop {
        session: SessionId,
    },
    AuthClearCookies,
    AuthDismiss {
        session: SessionId,
    },
}

pub struct JsonLineWriter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLineWriter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn emit(&self, event: &Event<'_>) -> Result<(), BridgeError> {
        let line = serde_json::to_string(event)?;
        let mut out = self.out.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }

    fn emit_logged(&self, event: &Event<'_>) {
        if let Err(err) = self.emit(event) {
            tracing::error!(target: "bridge", error = %err, "failed to write event");
        }
    }
}

pub struct StdioHost {
    writer: Arc<JsonLineWriter>,
}

impl StdioHost {
    pub fn new(writer: Arc<JsonLineWriter>) -> Self {
        Self { writer }
    }
}

impl HostBridge for StdioHost {
    fn send_message(&self, object: &str, method: &str, message: &str) -> Result<(), BridgeError> {
        self.writer.emit(&Event::HostMessage {
            object,
            method,
            message,
        })
    }
}

pub struct StdioNotificationSurface {
    writer: Arc<JsonLineWriter>,
}

impl StdioNotificationSurface {
    pub fn new(writer: Arc<JsonLineWriter>) -> Self {
        Self { writer }
    }
}

impl NotificationSurface for StdioNotificationSurface {
    fn notify(&self, descriptor: &NotificationDescriptor) {
        self.writer.emit_logged(&Event::Notification { descriptor });
    }
}

pub struct StdioAuthSurface {
    writer: Arc<JsonLineWriter>,
}

impl StdioAuthSurface {
    pub fn new(writer: Arc<JsonLineWriter>) -> Self {
        Self { writer }
    }
}

impl AuthSurface for StdioAuthSurface {
    fn load_url(&self, session: SessionId, url: &str, user_agent: Option<&str>) {
        self.writer.emit_logged(&Event::AuthLoad {
            session,
            url,
            user_agent,
        });
    }

    fn stop_loading(&self, session: SessionId) {
        self.writer.emit_logged(&Event::AuthStop { session });
    }

    fn clear_session_cookies(&self) {
        self.writer.emit_logged(&Event::AuthClearCookies);
    }

    fn dismiss(&self, session: SessionId) {
        self.writer.emit_logged(&Event::AuthDismiss { session });
    }
}
