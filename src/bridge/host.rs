use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to write to host: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode host event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Named-callback channel into the game engine: `object.method(message)`.
pub trait HostBridge: Send + Sync {
    fn send_message(&self, object: &str, method: &str, message: &str) -> Result<(), BridgeError>;
}

/// Sends a callback to the engine, logging instead of failing when delivery breaks.
pub fn dispatch(host: &dyn HostBridge, object: &str, method: &str, message: &str) {
    if let Err(err) = host.send_message(object, method, message) {
        tracing::error!(
            target: "bridge",
            error = %err,
            object,
            method,
            "failed to send message to host"
        );
    }
}
