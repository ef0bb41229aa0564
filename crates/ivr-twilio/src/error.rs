//! Error types for ivr-twilio

use thiserror::Error;

/// ivr-twilio error type
#[derive(Error, Debug)]
pub enum TwilioError {
    #[error("Twilio credentials not set")]
    CredentialsNotSet,

    #[error("Twilio API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TwilioError>;
