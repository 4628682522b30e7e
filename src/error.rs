use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// The server rejected the bearer token (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// The server answered with any other non-success status.
    #[error("Request to {endpoint} failed with status {status}")]
    RequestFailed { status: u16, endpoint: String },

    /// A local precondition failed before any request was made.
    #[error("{0}")]
    ValidationFailed(String),

    /// A name that no longer exists in the locally held tree.
    #[error("No longer present: {0}")]
    StaleReference(String),

    /// The request never produced a response (connection, TLS, body read).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response or stored file could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// I/O errors from local file handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid configuration or CLI input.
    #[error("Config error: {0}")]
    Config(String),
}

impl AppError {
    /// Whether the server rejected our credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized)
    }
}
