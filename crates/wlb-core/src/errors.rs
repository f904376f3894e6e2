/// Core error type for the bot engine.
///
/// Adapter crates map their transport errors into this type so the engine can
/// tell retryable network trouble apart from failures it must surface.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network hiccup, timeout or platform back-pressure. Retried, never shown to users.
    #[error("transient network error: {0}")]
    Transient(String),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("webhook registration failed after {attempts} attempt(s): {reason}")]
    Registration { attempts: u32, reason: String },

    #[error("malformed control: {0}")]
    MalformedControl(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
