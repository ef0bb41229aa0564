//! Route definitions
//!
//! Path and method classify the call event; anything unrouted gets a
//! plain-text diagnostic instead of TwiML.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    call_status, health, index, method_not_allowed, not_found, process_followup, process_speech,
    test_tts, voice,
};
use crate::middleware::verify_twilio_signature;
use crate::server::AppState;

/// Build the webhook router
pub fn routes(state: AppState) -> Router {
    // Endpoints Twilio calls, behind signature validation
    let webhooks = Router::new()
        .route("/voice", get(voice).post(voice))
        .route("/process_speech", post(process_speech))
        .route("/process_followup", post(process_followup))
        .route("/call_status", post(call_status))
        .route_layer(from_fn_with_state(state.clone(), verify_twilio_signature));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/test_tts", get(test_tts))
        .merge(webhooks)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use ivr_core::{Config, Topic};
    use tower::ServiceExt;

    const OPERATOR: &str = "+15557654321";

    fn config() -> Config {
        let mut config = Config::default();
        config.business.name = "Green Slice".to_string();
        config.business.operator_phone = Some(OPERATOR.to_string());
        config
    }

    fn app(config: Config) -> Router {
        routes(AppState::new(config))
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_incoming_call_gathers_speech() {
        let (status, content_type, body) = send(
            app(config()),
            post_form(
                "/voice",
                "From=%2B15551112222&To=%2B15553334444&CallSid=CA123&AccountSid=AC1",
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/xml"));
        assert!(body.contains("<Gather"));
        assert!(body.contains("<Say"));
        assert!(body.contains(r#"action="/process_speech""#));
        assert!(body.contains("Green Slice"));
    }

    #[tokio::test]
    async fn test_incoming_call_via_get() {
        let (status, content_type, body) =
            send(app(config()), get_request("/voice?From=%2B15551112222")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/xml"));
        assert!(body.contains("<Gather"));
    }

    #[tokio::test]
    async fn test_pricing_question() {
        let (status, _, body) = send(
            app(config()),
            post_form(
                "/process_speech",
                "CallSid=CA123&SpeechResult=How+much+does+lawn+care+cost%3F&Confidence=0.9",
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let pricing = Topic::Pricing.reply("Green Slice");
        assert!(body.contains(&pricing[..40]));
        assert!(body.contains(r#"action="/process_followup""#));
    }

    #[tokio::test]
    async fn test_empty_speech_transfers() {
        let (_, _, body) = send(
            app(config()),
            post_form("/process_speech", "CallSid=CA123&SpeechResult=&Confidence=0.0"),
        )
        .await;

        assert!(body.contains("quite catch that"));
        assert!(body.contains(&format!(">{}</Dial>", OPERATOR)));
        assert!(!body.contains("<Gather"));
    }

    #[tokio::test]
    async fn test_forward_keyword_transfers() {
        let (_, _, body) = send(
            app(config()),
            post_form(
                "/process_speech",
                "SpeechResult=I+want+to+speak+to+the+manager&Confidence=0.95",
            ),
        )
        .await;

        assert!(body.contains("<Dial"));
    }

    #[tokio::test]
    async fn test_unreadable_body_is_treated_as_empty() {
        let request = Request::builder()
            .method("POST")
            .uri("/process_speech")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("SpeechResult=hello"))
            .unwrap();
        let (status, content_type, body) = send(app(config()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/xml"));
        assert!(body.contains("<Dial"));
    }

    #[tokio::test]
    async fn test_follow_up_goodbye_hangs_up() {
        let (_, _, body) = send(
            app(config()),
            post_form("/process_followup", "SpeechResult=thank+you%2C+bye"),
        )
        .await;

        assert!(body.contains("Thank you for calling Green Slice"));
        assert!(body.ends_with("<Hangup/></Response>"));
        assert!(!body.contains("<Gather"));
    }

    #[tokio::test]
    async fn test_composition_failure_uses_fallback() {
        let mut config = config();
        config.server.webhook_base_url = Some("ftp://ivr.example.com".to_string());

        let (status, content_type, body) =
            send(app(config), post_form("/voice", "CallSid=CA123")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/xml"));
        assert!(body.contains("technical issue"));
        assert!(body.ends_with(&format!(">{}</Dial></Response>", OPERATOR)));
    }

    #[tokio::test]
    async fn test_call_status_is_plain_text() {
        let (status, content_type, body) = send(
            app(config()),
            post_form("/call_status", "CallSid=CA123&CallStatus=completed&CallDuration=42"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, content_type, body) = send(app(config()), get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("application/json"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["mode"], "demo");
        assert_eq!(json["business"], "Green Slice");
        assert_eq!(json["port"], 5000);
        assert_eq!(json["operator_configured"], true);
    }

    #[tokio::test]
    async fn test_index() {
        let (status, _, body) = send(app(config()), get_request("/")).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json["endpoints"]["voice"].is_string());
    }

    #[tokio::test]
    async fn test_tts_sample() {
        let (status, content_type, body) = send(app(config()), get_request("/test_tts")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/xml"));
        assert!(body.contains("Text-to-speech is working correctly!"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_plain_text() {
        let (status, content_type, body) = send(app(config()), get_request("/nope")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("No route for GET /nope"));
    }

    #[tokio::test]
    async fn test_wrong_method_is_plain_text() {
        let (status, content_type, body) =
            send(app(config()), get_request("/process_speech")).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("/process_speech does not accept GET"));
    }

    mod signatures {
        use super::*;
        use ivr_twilio::{compute_signature, SIGNATURE_HEADER};

        const TOKEN: &str = "test-auth-token";

        fn signed_config() -> Config {
            let mut config = config();
            config.twilio.auth_token = TOKEN.to_string();
            config.server.webhook_base_url = Some("https://ivr.example.com".to_string());
            config.server.validate_signatures = true;
            config
        }

        #[tokio::test]
        async fn test_missing_signature_is_rejected() {
            let (status, _, _) =
                send(app(signed_config()), post_form("/voice", "CallSid=CA123")).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }

        #[tokio::test]
        async fn test_valid_signature_is_accepted() {
            let params = vec![
                ("CallSid".to_string(), "CA123".to_string()),
                ("From".to_string(), "+15551112222".to_string()),
            ];
            let signature = compute_signature(TOKEN, "https://ivr.example.com/voice", &params);

            let mut request = post_form("/voice", "CallSid=CA123&From=%2B15551112222");
            request
                .headers_mut()
                .insert(SIGNATURE_HEADER, signature.parse().unwrap());

            let (status, _, body) = send(app(signed_config()), request).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("<Gather"));
        }

        #[tokio::test]
        async fn test_forged_signature_is_rejected() {
            let mut request = post_form("/process_speech", "SpeechResult=hello");
            request
                .headers_mut()
                .insert(SIGNATURE_HEADER, "bm90IGEgc2lnbmF0dXJl".parse().unwrap());

            let (status, _, _) = send(app(signed_config()), request).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }

        #[tokio::test]
        async fn test_health_is_not_signed() {
            let (status, _, _) = send(app(signed_config()), get_request("/health")).await;
            assert_eq!(status, StatusCode::OK);
        }
    }
}
