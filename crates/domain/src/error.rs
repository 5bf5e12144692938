/// Shared error type used across all voice-orchestrator crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("database: {0}")]
    Database(String),

    #[error("billing: {0}")]
    Billing(String),

    #[error("call not found: {0}")]
    CallNotFound(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a failed operation of this kind is worth retrying against a
    /// fallback provider. Mirrors the router's retry policy: transient
    /// transport/timeout/5xx-shaped failures are retriable, auth and config
    /// failures are not.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout(_) | Error::Provider { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
