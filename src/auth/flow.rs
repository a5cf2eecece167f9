use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{
    auth::{
        redirect::is_redirect,
        result::{encode_for_host, AuthResult},
    },
    bridge::{dispatch, HostBridge, UiThread},
    config::DialogResources,
};

pub const RESULT_METHOD: &str = "OnSocialAuthenticationFinished";

/// Receives the session's result once it reaches a terminal state.
pub type AuthOutcome = oneshot::Receiver<AuthResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

/// The web view hosting a login page.
pub trait AuthSurface: Send + Sync {
    fn load_url(&self, session: SessionId, url: &str, user_agent: Option<&str>);
    fn stop_loading(&self, session: SessionId);
    fn clear_session_cookies(&self);
    fn dismiss(&self, session: SessionId);
}

#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub callback_object: String,
    pub target_url: String,
    pub redirect_url: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Starting,
    Loading,
    Finished,
    Canceled,
    RetryLater,
    Error,
}

impl AuthState {
    fn of(result: &AuthResult) -> Self {
        match result {
            AuthResult::Finished { .. } => AuthState::Finished,
            AuthResult::Canceled => AuthState::Canceled,
            AuthResult::RetryLater => AuthState::RetryLater,
            AuthResult::Error { .. } => AuthState::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AuthState::Starting | AuthState::Loading)
    }
}

/// Web view load failures, keyed by the platform's error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationError {
    HostLookup,
    Connect,
    Timeout,
    Other(i32),
}

impl NavigationError {
    pub fn from_code(code: i32) -> Self {
        match code {
            -2 => NavigationError::HostLookup,
            -6 => NavigationError::Connect,
            -8 => NavigationError::Timeout,
            other => NavigationError::Other(other),
        }
    }

    pub fn is_expected(&self) -> bool {
        !matches!(self, NavigationError::Other(_))
    }
}

struct SessionInner {
    state: AuthState,
    completion: Option<oneshot::Sender<AuthResult>>,
}

/// One login attempt. Reaches exactly one terminal result.
pub struct AuthSession {
    id: SessionId,
    request: AuthRequest,
    host: Arc<dyn HostBridge>,
    surface: Arc<dyn AuthSurface>,
    inner: Mutex<SessionInner>,
}

impl AuthSession {
    pub fn new(
        id: SessionId,
        request: AuthRequest,
        host: Arc<dyn HostBridge>,
        surface: Arc<dyn AuthSurface>,
    ) -> (Arc<Self>, AuthOutcome) {
        let (sender, receiver) = oneshot::channel();
        let session = Arc::new(Self {
            id,
            request,
            host,
            surface,
            inner: Mutex::new(SessionInner {
                state: AuthState::Starting,
                completion: Some(sender),
            }),
        });
        (session, receiver)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> AuthState {
        self.inner.lock().state
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Builds the dialog and starts loading the login page. Must run on the UI thread.
    pub fn start(&self, resources: &DialogResources) {
        if let Err(message) = check_resources(resources) {
            tracing::warn!(
                target: "auth",
                session = self.id.0,
                %message,
                "dialog resources missing"
            );
            self.finish(AuthResult::Error { message });
            return;
        }
        {
            let mut inner = self.inner.lock();
            if inner.state != AuthState::Starting {
                return;
            }
            inner.state = AuthState::Loading;
        }
        tracing::debug!(
            target: "auth",
            session = self.id.0,
            url = %self.request.target_url,
            "loading login page"
        );
        self.surface.load_url(
            self.id,
            &self.request.target_url,
            self.request.user_agent.as_deref(),
        );
    }

    pub fn on_load_resource(&self, url: &str) {
        if self.state() != AuthState::Loading || !self.matches_redirect(url) {
            return;
        }
        self.surface.stop_loading(self.id);
        self.finish(AuthResult::Finished {
            url: url.to_string(),
        });
    }

    pub fn on_page_finished(&self, url: &str) {
        if self.state() != AuthState::Loading || !self.matches_redirect(url) {
            return;
        }
        self.finish(AuthResult::Finished {
            url: url.to_string(),
        });
    }

    /// Every load failure ends the session with `RetryLater`; the error kind
    /// only decides how loudly it is logged.
    pub fn on_received_error(&self, code: i32, description: &str, failing_url: &str) {
        if self.state() != AuthState::Loading {
            return;
        }
        let error = NavigationError::from_code(code);
        if error.is_expected() {
            tracing::debug!(
                target: "auth",
                session = self.id.0,
                ?error,
                failing_url,
                "page load failed"
            );
        } else {
            tracing::debug!(
                target: "auth",
                session = self.id.0,
                code,
                description,
                failing_url,
                "unexpected page load error"
            );
        }
        self.finish(AuthResult::RetryLater);
    }

    pub fn cancel(&self) {
        if self.state() != AuthState::Loading {
            return;
        }
        self.finish(AuthResult::Canceled);
    }

    fn matches_redirect(&self, url: &str) -> bool {
        is_redirect(&self.request.redirect_url, url)
    }

    fn finish(&self, result: AuthResult) -> bool {
        self.finish_with(result, AuthResult::to_host_json)
    }

    fn finish_with<E>(&self, result: AuthResult, encode: E) -> bool
    where
        E: Fn(&AuthResult) -> Result<String, serde_json::Error>,
    {
        let (result, json) = encode_for_host(result, encode);
        let completion = {
            let mut inner = self.inner.lock();
            let Some(completion) = inner.completion.take() else {
                return false;
            };
            inner.state = AuthState::of(&result);
            completion
        };

        tracing::info!(
            target: "auth",
            session = self.id.0,
            result = result.kind(),
            "login finished"
        );
        dispatch(
            self.host.as_ref(),
            &self.request.callback_object,
            RESULT_METHOD,
            &json,
        );
        self.surface.clear_session_cookies();
        self.surface.dismiss(self.id);
        // The caller may have stopped listening; the host already has the result.
        let _ = completion.send(result);
        true
    }
}

fn check_resources(resources: &DialogResources) -> Result<(), String> {
    if resources.layout.is_none() {
        return Err("auth dialog layout is not found.".to_string());
    }
    if resources.web_view.is_none() {
        return Err("auth dialog web view is not found.".to_string());
    }
    if resources.cancel_button.is_none() {
        return Err("auth dialog cancel button is not found.".to_string());
    }
    Ok(())
}

/// Opens login sessions and moves their setup onto the UI thread.
pub struct AuthFlowController {
    ui: UiThread,
    host: Arc<dyn HostBridge>,
    surface: Arc<dyn AuthSurface>,
    resources: DialogResources,
    next_id: AtomicU64,
}

impl AuthFlowController {
    pub fn new(
        ui: UiThread,
        host: Arc<dyn HostBridge>,
        surface: Arc<dyn AuthSurface>,
        resources: DialogResources,
    ) -> Self {
        Self {
            ui,
            host,
            surface,
            resources,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn show(&self, request: AuthRequest) -> (Arc<AuthSession>, AuthOutcome) {
        let (session, outcome) = self.open(request);
        self.launch(&session);
        (session, outcome)
    }

    /// Creates a session without touching the surface yet.
    pub fn open(&self, request: AuthRequest) -> (Arc<AuthSession>, AuthOutcome) {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        AuthSession::new(id, request, self.host.clone(), self.surface.clone())
    }

    /// Starts an opened session on the UI thread.
    pub fn launch(&self, session: &Arc<AuthSession>) {
        let on_ui = session.clone();
        let resources = self.resources.clone();
        if !self.ui.post(move || on_ui.start(&resources)) {
            session.finish(AuthResult::Error {
                message: "ui thread is not running".to_string(),
            });
        }
    }
}
