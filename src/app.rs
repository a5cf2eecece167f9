use std::{collections::HashMap, sync::Arc, thread};

use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
};

use crate::{
    auth::{AuthFlowController, AuthRequest, AuthSession, SessionId},
    bridge::{
        Event, HostBridge, JsonLineWriter, StdioAuthSurface, StdioHost, StdioNotificationSurface,
        UiThread,
    },
    config::AppConfig,
    domain::Payload,
    infrastructure::directories::ResolvedPaths,
    push::{
        FileMessageStore, HttpRegistrar, PushPlugin, TrayPushHandler, REGISTRATION_ATTEMPTS,
    },
};

const DEFAULT_AUTH_OBJECT: &str = "KiiSocialConnect";

/// One line of input from the engine side.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Command {
    SetListener {
        name: String,
    },
    SetSenderId {
        sender_id: String,
    },
    Push {
        payload: Payload,
        #[serde(default)]
        foreground: bool,
    },
    Register,
    Unregister,
    LastMessage,
    AuthStart {
        #[serde(default)]
        object: Option<String>,
        target_url: String,
        redirect_url: String,
        #[serde(default)]
        user_agent: Option<String>,
    },
    AuthEvent {
        session: SessionId,
        event: NavigationEvent,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum NavigationEvent {
    LoadResource {
        url: String,
    },
    PageFinished {
        url: String,
    },
    Error {
        code: i32,
        #[serde(default)]
        description: String,
        #[serde(default)]
        failing_url: String,
    },
    Cancel,
}

pub struct BridgeApp {
    config: Arc<AppConfig>,
    writer: Arc<JsonLineWriter>,
    ui: UiThread,
    ui_handle: thread::JoinHandle<()>,
    push: Arc<PushPlugin>,
    registrations: Vec<JoinHandle<()>>,
    auth: AuthFlowController,
    sessions: HashMap<SessionId, Arc<AuthSession>>,
}

impl BridgeApp {
    pub fn initialize(config: AppConfig, paths: ResolvedPaths) -> Result<Self> {
        Self::with_writer(config, paths, Arc::new(JsonLineWriter::stdout()))
    }

    pub fn with_writer(
        config: AppConfig,
        paths: ResolvedPaths,
        writer: Arc<JsonLineWriter>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let host: Arc<dyn HostBridge> = Arc::new(StdioHost::new(writer.clone()));
        let (ui, ui_handle) = UiThread::spawn().context("failed to start ui thread")?;

        let http_client = Client::builder()
            .user_agent(format!("kii-bridge/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let registrar = Arc::new(HttpRegistrar::new(
            http_client,
            config.registration_endpoint.as_deref(),
            config.registration_timeout,
        )?);

        let handler = Arc::new(TrayPushHandler::new(
            config.clone(),
            Arc::new(StdioNotificationSurface::new(writer.clone())),
        ));
        let push = Arc::new(PushPlugin::new(
            config.listener_object.clone(),
            config.sender_id.clone(),
            host.clone(),
            handler,
            Arc::new(FileMessageStore::new(&paths.last_message_path)),
            registrar,
        ));

        let auth = AuthFlowController::new(
            ui.clone(),
            host,
            Arc::new(StdioAuthSurface::new(writer.clone())),
            config.auth.dialog.clone(),
        );

        Ok(Self {
            config,
            writer,
            ui,
            ui_handle,
            push,
            registrations: Vec::new(),
            auth,
            sessions: HashMap::new(),
        })
    }

    pub async fn run(mut self) -> Result<()> {
        tracing::info!(target: "bridge", "bridge started");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line.context("failed to read command")? {
                        Some(line) => self.handle_line(&line),
                        None => {
                            tracing::info!(target: "bridge", "input closed");
                            break;
                        }
                    }
                }
                _ = &mut ctrl_c => {
                    tracing::info!(target: "bridge", "interrupt received");
                    break;
                }
            }
        }

        self.finish_registrations().await;
        let BridgeApp {
            ui, ui_handle, auth, ..
        } = self;
        drop(auth);
        drop(ui);
        if ui_handle.join().is_err() {
            tracing::error!(target: "bridge", "ui thread panicked");
        }
        tracing::info!(target: "bridge", "bridge stopped");
        Ok(())
    }

    /// Gives in-flight registrations the time their attempts may take.
    async fn finish_registrations(&mut self) {
        self.registrations.retain(|handle| !handle.is_finished());
        if self.registrations.is_empty() {
            return;
        }
        let pending = self.registrations.len();
        let grace = self.config.registration_timeout * REGISTRATION_ATTEMPTS as u32;
        tracing::info!(target: "registration", pending, ?grace, "waiting for registrations");
        let handles = std::mem::take(&mut self.registrations);
        if tokio::time::timeout(grace, join_all(handles)).await.is_err() {
            tracing::warn!(
                target: "registration",
                pending,
                "registrations still running at shutdown, outcome dropped"
            );
        }
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<Command>(line) {
            Ok(command) => self.handle_command(command),
            Err(err) => {
                tracing::warn!(target: "bridge", error = %err, "ignoring malformed command");
            }
        }
        self.sessions.retain(|_, session| !session.is_finished());
        self.registrations.retain(|handle| !handle.is_finished());
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetListener { name } => self.push.set_listener_object(name),
            Command::SetSenderId { sender_id } => self.push.set_sender_id(sender_id),
            Command::Push {
                payload,
                foreground,
            } => {
                self.push.handle_message(&payload, foreground);
            }
            Command::Register => self.registrations.push(self.push.register()),
            Command::Unregister => self.registrations.push(self.push.unregister()),
            Command::LastMessage => {
                let message = match self.push.last_message() {
                    Ok(message) => message,
                    Err(err) => {
                        tracing::warn!(target: "push", error = %err, "failed to read last message");
                        None
                    }
                };
                self.emit(&Event::LastMessage {
                    message: message.as_deref(),
                });
            }
            Command::AuthStart {
                object,
                target_url,
                redirect_url,
                user_agent,
            } => self.start_auth(object, target_url, redirect_url, user_agent),
            Command::AuthEvent { session, event } => self.forward_auth_event(session, event),
        }
    }

    fn start_auth(
        &mut self,
        object: Option<String>,
        target_url: String,
        redirect_url: String,
        user_agent: Option<String>,
    ) {
        let callback_object = object
            .or_else(|| self.config.auth.callback_object.clone())
            .unwrap_or_else(|| DEFAULT_AUTH_OBJECT.to_string());
        let request = AuthRequest {
            callback_object,
            target_url,
            redirect_url,
            user_agent: user_agent.or_else(|| self.config.auth.user_agent.clone()),
        };

        let (session, outcome) = self.auth.open(request);
        let id = session.id();
        self.emit(&Event::AuthStarted { session: id });
        self.auth.launch(&session);
        self.sessions.insert(id, session);
        tokio::spawn(async move {
            if let Ok(result) = outcome.await {
                tracing::debug!(
                    target: "auth",
                    session = id.0,
                    result = result.kind(),
                    "session closed"
                );
            }
        });
    }

    fn forward_auth_event(&self, id: SessionId, event: NavigationEvent) {
        let Some(session) = self.sessions.get(&id).cloned() else {
            tracing::warn!(target: "auth", session = id.0, "event for unknown session");
            return;
        };
        let posted = self.ui.post(move || match event {
            NavigationEvent::LoadResource { url } => session.on_load_resource(&url),
            NavigationEvent::PageFinished { url } => session.on_page_finished(&url),
            NavigationEvent::Error {
                code,
                description,
                failing_url,
            } => session.on_received_error(code, &description, &failing_url),
            NavigationEvent::Cancel => session.cancel(),
        });
        if !posted {
            tracing::error!(target: "auth", session = id.0, "ui thread is gone");
        }
    }

    fn emit(&self, event: &Event<'_>) {
        if let Err(err) = self.writer.emit(event) {
            tracing::error!(target: "bridge", error = %err, "failed to write event");
        }
    }
}
