use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolyevalError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Error raised by guest code; the message is the guest's own.
    #[error("{0}")]
    GuestEvaluation(String),

    #[error("Guest runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PolyevalError>;
