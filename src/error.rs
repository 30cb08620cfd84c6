//! Error types shared by every stage of a run.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// Missing or malformed config / client secret file.
    #[error("configuration error: {0}")]
    Config(String),
    /// Authorization code could not be read or exchanged, or refresh failed.
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// Gmail answered with an error envelope.
    #[error("mail api error {status}: {message}")]
    MailApi { status: StatusCode, message: String },
    #[error("sms error: {0}")]
    Sms(String),
}

pub type Result<T> = std::result::Result<T, Error>;
