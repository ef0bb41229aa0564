//! Twilio signature validation
//!
//! Applied to the webhook routes only. Does nothing unless
//! `validate_signatures` is enabled.

use axum::{
    body::{self, Body},
    extract::{Request, State},
    http::{header, request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use ivr_core::Config;
use ivr_twilio::{verify_signature, SIGNATURE_HEADER};

use crate::server::AppState;

/// Twilio webhook bodies are small form posts
const MAX_BODY_BYTES: usize = 64 * 1024;

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, "Invalid Twilio signature\n").into_response()
}

/// URL Twilio signed: the public base URL when known, else the Host header
fn signed_url(config: &Config, parts: &Parts) -> String {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    config.webhook_url(path_and_query).unwrap_or_else(|| {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        format!("https://{}{}", host, path_and_query)
    })
}

/// Reject webhooks whose `X-Twilio-Signature` does not match
pub async fn verify_twilio_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.server.validate_signatures {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();

    let Some(signature) = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        warn!("Missing Twilio signature on {}", parts.uri.path());
        return forbidden();
    };

    let bytes = match body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read body on {}: {}", parts.uri.path(), e);
            return (StatusCode::BAD_REQUEST, "Unreadable request body\n").into_response();
        }
    };

    let params: Vec<(String, String)> = if parts.method == Method::POST {
        url::form_urlencoded::parse(&bytes).into_owned().collect()
    } else {
        Vec::new()
    };

    let url = signed_url(&state.config, &parts);
    if !verify_signature(&state.config.twilio.auth_token, &url, &params, &signature) {
        warn!("Invalid Twilio signature for {}", url);
        return forbidden();
    }

    debug!("Verified Twilio signature for {}", url);
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
