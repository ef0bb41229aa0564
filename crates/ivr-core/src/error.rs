//! Error types for ivr-core

use thiserror::Error;

/// Main error type for ivr-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TwiML rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Render(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Render(err.to_string())
    }
}

/// Reasons the composer could not build a directive for a call event.
///
/// Every variant is recoverable: the dispatcher answers with the fallback
/// apology-and-transfer directive instead.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid webhook base URL {base:?}: {source}")]
    CallbackUrl {
        base: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Webhook base URL must use http or https: {0}")]
    CallbackScheme(String),

    #[error("Event kind {0} does not produce a call directive")]
    Unsupported(&'static str),
}

/// Result type alias for ivr-core
pub type Result<T> = std::result::Result<T, Error>;
