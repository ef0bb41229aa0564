//! Webhook handlers
//!
//! Each Twilio endpoint decodes its form into a [`CallEvent`], asks the
//! composer for a directive and renders it. Form bodies that fail to decode
//! are treated as carrying no fields.

use axum::{
    extract::{rejection::FormRejection, Form, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use ivr_core::{CallEvent, CallEventKind, Outcome, WebhookForm};

use crate::server::AppState;

const TWIML_CONTENT_TYPE: &str = "text/xml";

type WebhookFormResult = Result<Form<WebhookForm>, FormRejection>;

/// Health check payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub mode: &'static str,
    pub business: String,
    pub port: u16,
    pub webhook_url: Option<String>,
    pub operator_configured: bool,
}

fn mode(state: &AppState) -> &'static str {
    if state.config.is_demo_mode() {
        "demo"
    } else {
        "production"
    }
}

fn read_form(form: WebhookFormResult, endpoint: &str) -> WebhookForm {
    match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!(
                "Unreadable form on {}, treating fields as absent: {}",
                endpoint, rejection
            );
            WebhookForm::default()
        }
    }
}

fn twiml(body: String) -> Response {
    ([(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)], body).into_response()
}

/// Compose, log the decision, render
fn respond(state: &AppState, event: &CallEvent) -> Response {
    let outcome = state.composer.respond(event);

    match &outcome {
        Outcome::Composed(directive) => info!(
            "Call {} ({}): {}",
            event.call_sid,
            event.kind.name(),
            directive.kind()
        ),
        Outcome::Fallback { cause, .. } => error!(
            "Call {} ({}): using fallback response: {}",
            event.call_sid,
            event.kind.name(),
            cause
        ),
    }

    twiml(state.renderer.render_or_fallback(outcome.directive()))
}

/// Service index
pub async fn index(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "IVR gateway is running",
        "status": "success",
        "mode": mode(&state),
        "business": state.config.business.name,
        "endpoints": {
            "voice": "/voice (GET, POST)",
            "process_speech": "/process_speech (POST)",
            "process_followup": "/process_followup (POST)",
            "call_status": "/call_status (POST)",
            "health": "/health (GET)",
            "test_tts": "/test_tts (GET)",
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// New call
pub async fn voice(State(state): State<AppState>, form: WebhookFormResult) -> Response {
    let event = CallEvent::incoming(&read_form(form, "/voice"));
    info!(
        "Incoming call {} from {} to {}",
        event.call_sid, event.caller, event.called
    );
    respond(&state, &event)
}

/// Answer to the greeting
pub async fn process_speech(State(state): State<AppState>, form: WebhookFormResult) -> Response {
    let event = CallEvent::speech(&read_form(form, "/process_speech"));
    if let CallEventKind::Speech(speech) = &event.kind {
        info!(
            "Call {} said {:?} (confidence {:?})",
            event.call_sid, speech.text, speech.confidence
        );
    }
    respond(&state, &event)
}

/// Answer to the follow-up prompt
pub async fn process_followup(State(state): State<AppState>, form: WebhookFormResult) -> Response {
    let event = CallEvent::follow_up(&read_form(form, "/process_followup"));
    if let CallEventKind::FollowUp(speech) = &event.kind {
        info!("Call {} follow-up {:?}", event.call_sid, speech.text);
    }
    respond(&state, &event)
}

/// Call lifecycle notification; logged only
pub async fn call_status(form: WebhookFormResult) -> &'static str {
    let event = CallEvent::status_update(&read_form(form, "/call_status"));

    if let CallEventKind::StatusUpdate(status) = &event.kind {
        match status.duration_secs {
            Some(secs) if status.is_final() => info!(
                "Call {} from {} {} after {}s",
                event.call_sid, event.caller, status.status, secs
            ),
            _ => info!("Call {} status: {}", event.call_sid, status.status),
        }
    }

    "OK"
}

/// Liveness and configuration echo
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: mode(&state),
        business: state.config.business.name.clone(),
        port: state.config.server.port,
        webhook_url: state.config.server.webhook_base_url.clone(),
        operator_configured: state.config.operator_phone().is_some(),
    })
}

/// Static sample for checking text-to-speech
pub async fn test_tts(State(state): State<AppState>) -> Response {
    twiml(state.renderer.render_or_fallback(&state.composer.test_tts()))
}

/// Unknown path
pub async fn not_found(method: Method, uri: Uri) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!(
            "No route for {} {}.\n\
             This service answers Twilio voice webhooks: /voice, /process_speech, \
             /process_followup and /call_status. Try GET /health.\n",
            method,
            uri.path()
        ),
    )
}

/// Known path, wrong method
pub async fn method_not_allowed(method: Method, uri: Uri) -> (StatusCode, String) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        format!(
            "{} does not accept {}. Twilio sends webhooks as POST form requests.\n",
            uri.path(),
            method
        ),
    )
}
