use serde::Serialize;

/// Terminal outcome of one login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Finished { url: String },
    Canceled,
    RetryLater,
    Error { message: String },
}

#[derive(Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
enum HostPayload<'a> {
    Finished { url: &'a str },
    Retry,
    Canceled,
    Error { message: &'a str },
}

impl AuthResult {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthResult::Finished { .. } => "finished",
            AuthResult::Canceled => "canceled",
            AuthResult::RetryLater => "retry",
            AuthResult::Error { .. } => "error",
        }
    }

    /// Encodes the result the way the engine's login callback expects it.
    pub fn to_host_json(&self) -> Result<String, serde_json::Error> {
        let payload = match self {
            AuthResult::Finished { url } => HostPayload::Finished { url },
            AuthResult::Canceled => HostPayload::Canceled,
            AuthResult::RetryLater => HostPayload::Retry,
            AuthResult::Error { message } => HostPayload::Error { message },
        };
        serde_json::to_string(&payload)
    }
}

/// Encodes `result`, turning an encoding failure into an `Error` result that
/// carries the failure's debug text.
pub fn encode_for_host<E>(result: AuthResult, encode: E) -> (AuthResult, String)
where
    E: Fn(&AuthResult) -> Result<String, serde_json::Error>,
{
    match encode(&result) {
        Ok(json) => (result, json),
        Err(err) => {
            let message = format!("{err:?}");
            let json = serde_json::json!({
                "type": "error",
                "value": { "message": message },
            })
            .to_string();
            (AuthResult::Error { message }, json)
        }
    }
}
