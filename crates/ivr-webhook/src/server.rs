//! Webhook server
//!
//! Starts and manages the axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use ivr_core::{Composer, Config, TwimlRenderer};

use crate::error::{Result, WebhookError};
use crate::routes::routes;

/// Shared application state; read-only after startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub composer: Arc<Composer>,
    pub renderer: Arc<TwimlRenderer>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let composer = Composer::new(&config);
        let renderer = TwimlRenderer::new(&config.speech);

        Self {
            config: Arc::new(config),
            composer: Arc::new(composer),
            renderer: Arc::new(renderer),
        }
    }
}

/// Serve webhooks on `0.0.0.0:{port}` until `shutdown` resolves
pub async fn start_server<F>(config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let app = routes(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| WebhookError::Bind { addr, source })?;
    info!("Webhook server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(WebhookError::Serve)?;

    info!("Webhook server stopped");
    Ok(())
}
