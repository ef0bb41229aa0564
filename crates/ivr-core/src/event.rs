//! Call events decoded from Twilio webhook form fields

use serde::Deserialize;

/// Raw Twilio webhook fields
///
/// Every field is optional: a missing or malformed value is treated as absent
/// rather than rejecting the request. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "SpeechResult")]
    pub speech_result: Option<String>,
    #[serde(rename = "Confidence")]
    pub confidence: Option<String>,
    #[serde(rename = "CallStatus")]
    pub call_status: Option<String>,
    #[serde(rename = "CallDuration")]
    pub call_duration: Option<String>,
}

/// Transcribed caller speech
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechResult {
    pub text: String,
    /// Recognizer confidence in `[0, 1]`; `None` when Twilio sent none
    pub confidence: Option<f32>,
}

impl SpeechResult {
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            confidence: confidence.filter(|c| !c.is_nan()).map(|c| c.clamp(0.0, 1.0)),
        }
    }

    fn from_form(form: &WebhookForm) -> Self {
        let confidence = form
            .confidence
            .as_deref()
            .and_then(|c| c.trim().parse::<f32>().ok());
        Self::new(form.speech_result.clone().unwrap_or_default(), confidence)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Confidence with "not reported" counted as zero
    pub fn effective_confidence(&self) -> f32 {
        self.confidence.unwrap_or(0.0)
    }
}

/// Call lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: String,
    pub duration_secs: Option<u32>,
}

impl StatusUpdate {
    /// Twilio's terminal call states
    pub fn is_final(&self) -> bool {
        matches!(
            self.status.as_str(),
            "completed" | "busy" | "failed" | "no-answer" | "canceled"
        )
    }
}

/// What a webhook notification is about
#[derive(Debug, Clone, PartialEq)]
pub enum CallEventKind {
    /// A new call reached the service number
    Incoming,
    /// First answer to the greeting
    Speech(SpeechResult),
    /// Answer to the "anything else?" prompt
    FollowUp(SpeechResult),
    StatusUpdate(StatusUpdate),
}

impl CallEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Speech(_) => "speech-result",
            Self::FollowUp(_) => "follow-up",
            Self::StatusUpdate(_) => "status-update",
        }
    }
}

/// One webhook notification, alive for a single request
#[derive(Debug, Clone, PartialEq)]
pub struct CallEvent {
    pub caller: String,
    pub called: String,
    pub call_sid: String,
    pub kind: CallEventKind,
}

const UNKNOWN: &str = "Unknown";

fn field_or_unknown(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

impl CallEvent {
    fn from_form(form: &WebhookForm, kind: CallEventKind) -> Self {
        Self {
            caller: field_or_unknown(&form.from),
            called: field_or_unknown(&form.to),
            call_sid: field_or_unknown(&form.call_sid),
            kind,
        }
    }

    pub fn incoming(form: &WebhookForm) -> Self {
        Self::from_form(form, CallEventKind::Incoming)
    }

    pub fn speech(form: &WebhookForm) -> Self {
        Self::from_form(form, CallEventKind::Speech(SpeechResult::from_form(form)))
    }

    pub fn follow_up(form: &WebhookForm) -> Self {
        Self::from_form(form, CallEventKind::FollowUp(SpeechResult::from_form(form)))
    }

    pub fn status_update(form: &WebhookForm) -> Self {
        let status = StatusUpdate {
            status: form
                .call_status
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            duration_secs: form
                .call_duration
                .as_deref()
                .and_then(|d| d.trim().parse().ok()),
        };
        Self::from_form(form, CallEventKind::StatusUpdate(status))
    }
}
