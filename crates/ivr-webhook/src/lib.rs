//! ivr-webhook: Twilio voice webhook server
//!
//! Routes Twilio's call notifications to the [`ivr_core::Composer`] and
//! answers with TwiML. Built with axum; all request data is local to the
//! handler, the only shared state is the immutable configuration.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{Result, WebhookError};
pub use routes::routes;
pub use server::{start_server, AppState};
