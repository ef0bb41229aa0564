//! Error types for ivr-webhook

use std::net::SocketAddr;

use thiserror::Error;

/// ivr-webhook error type
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WebhookError>;
