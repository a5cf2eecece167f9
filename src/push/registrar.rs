use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("push registration endpoint is not configured")]
    NotConfigured,
    #[error("push sender id is not configured")]
    MissingSenderId,
    #[error("push service returned an empty registration id")]
    EmptyRegistrationId,
    #[error("invalid push registration endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("push registration endpoint cannot carry a path: {0}")]
    CannotBeBase(Url),
    #[error("push registration request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Obtains and releases the device's push registration id.
pub trait PushRegistrar: Send + Sync {
    fn register<'a>(
        &'a self,
        sender_id: &'a str,
    ) -> BoxFuture<'a, Result<String, RegistrationError>>;
    fn unregister(&self) -> BoxFuture<'_, Result<(), RegistrationError>>;
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    sender_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    registration_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct UnregisterRequest<'a> {
    registration_id: Option<&'a str>,
}

pub struct HttpRegistrar {
    http: Client,
    endpoint: Option<Url>,
    timeout: Duration,
    registration_id: Mutex<Option<String>>,
}

impl HttpRegistrar {
    /// Requests that take longer than `timeout` fail with `RegistrationError::Http`.
    pub fn new(
        http: Client,
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, RegistrationError> {
        let endpoint = endpoint.map(Url::parse).transpose()?;
        Ok(Self {
            http,
            endpoint,
            timeout,
            registration_id: Mutex::new(None),
        })
    }

    fn endpoint_url(&self, action: &str) -> Result<Url, RegistrationError> {
        let mut url = self
            .endpoint
            .clone()
            .ok_or(RegistrationError::NotConfigured)?;
        if url.cannot_be_a_base() {
            return Err(RegistrationError::CannotBeBase(url));
        }
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(action);
        }
        Ok(url)
    }

    async fn register_once(&self, sender_id: &str) -> Result<String, RegistrationError> {
        if sender_id.is_empty() {
            return Err(RegistrationError::MissingSenderId);
        }
        let url = self.endpoint_url("register")?;
        let response: RegisterResponse = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(&RegisterRequest { sender_id })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let registration_id = response
            .registration_id
            .filter(|id| !id.is_empty())
            .ok_or(RegistrationError::EmptyRegistrationId)?;
        *self.registration_id.lock() = Some(registration_id.clone());
        Ok(registration_id)
    }

    async fn unregister_once(&self) -> Result<(), RegistrationError> {
        let url = self.endpoint_url("unregister")?;
        let registration_id = self.registration_id.lock().clone();
        self.http
            .post(url)
            .timeout(self.timeout)
            .json(&UnregisterRequest {
                registration_id: registration_id.as_deref(),
            })
            .send()
            .await?
            .error_for_status()?;
        *self.registration_id.lock() = None;
        Ok(())
    }
}

impl PushRegistrar for HttpRegistrar {
    fn register<'a>(
        &'a self,
        sender_id: &'a str,
    ) -> BoxFuture<'a, Result<String, RegistrationError>> {
        Box::pin(self.register_once(sender_id))
    }

    fn unregister(&self) -> BoxFuture<'_, Result<(), RegistrationError>> {
        Box::pin(self.unregister_once())
    }
}
