use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ycmd returned HTTP {status}: {body}")]
    Server { status: u16, body: String },

    #[error("ycmd has not been assigned a port yet")]
    NotStarted,

    #[error("Secret error: {0}")]
    Secret(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Acme error: {0}")]
    Acme(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
