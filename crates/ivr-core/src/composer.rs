//! Response composer
//!
//! Decides the next [`Directive`] for a call event. Composition is fallible
//! and says so in its signature; [`Composer::respond`] is the single place a
//! failure is turned into the apology-and-transfer fallback.

use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::directive::Directive;
use crate::error::DispatchError;
use crate::event::{CallEvent, CallEventKind, SpeechResult};
use crate::keywords::{FollowUpIntent, KeywordMatcher};
use crate::replies::Topic;

pub const SPEECH_PATH: &str = "/process_speech";
pub const FOLLOW_UP_PATH: &str = "/process_followup";

const LOW_CONFIDENCE_APOLOGY: &str =
    "I'm sorry, I didn't quite catch that. Let me connect you with someone from our team.";
const FORWARD_MESSAGE: &str = "Let me connect you with our team right away.";
const SILENCE_MESSAGE: &str = "I didn't hear anything. Let me connect you with our team.";
const FALLBACK_APOLOGY: &str =
    "I'm sorry, we're having a technical issue. Let me connect you with our team.";
const OPERATOR_UNAVAILABLE: &str = "Our team isn't available to take your call right now. \
    Please call back during business hours. Goodbye.";
const FOLLOW_UP_PROMPT: &str = "Is there anything else I can help you with? You can ask another \
    question, say transfer to speak with our team, or say goodbye to end the call.";

/// Why a caller is handed to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handoff {
    /// Nothing said after the greeting
    Silence,
    /// Empty or low-confidence transcript
    Unheard,
    /// Forward keyword or transfer phrase
    Requested,
    /// Composition failed
    Failure,
}

impl Handoff {
    fn message(self) -> &'static str {
        match self {
            Handoff::Silence => SILENCE_MESSAGE,
            Handoff::Unheard => LOW_CONFIDENCE_APOLOGY,
            Handoff::Requested => FORWARD_MESSAGE,
            Handoff::Failure => FALLBACK_APOLOGY,
        }
    }

    fn apologizes(self) -> bool {
        matches!(self, Handoff::Unheard | Handoff::Failure)
    }
}

/// Directive chosen for an event, or the fallback that replaced a failure
#[derive(Debug)]
pub enum Outcome {
    Composed(Directive),
    Fallback {
        directive: Directive,
        cause: DispatchError,
    },
}

impl Outcome {
    pub fn directive(&self) -> &Directive {
        match self {
            Outcome::Composed(directive) => directive,
            Outcome::Fallback { directive, .. } => directive,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }
}

/// Stateless decision logic shared by every webhook handler
#[derive(Debug, Clone)]
pub struct Composer {
    business: String,
    operator: Option<String>,
    confidence_threshold: f32,
    callback_base: Option<String>,
    matcher: KeywordMatcher,
}

impl Composer {
    pub fn new(config: &Config) -> Self {
        Self {
            business: config.business.name.clone(),
            operator: config.operator_phone().map(str::to_string),
            confidence_threshold: config.speech.confidence_threshold,
            callback_base: config.server.webhook_base_url.clone(),
            matcher: KeywordMatcher::new(&config.business.forward_keywords),
        }
    }

    /// Compose, replacing any failure with the fallback directive
    pub fn respond(&self, event: &CallEvent) -> Outcome {
        match self.compose(event) {
            Ok(directive) => Outcome::Composed(directive),
            Err(cause) => Outcome::Fallback {
                directive: self.fallback(),
                cause,
            },
        }
    }

    pub fn compose(&self, event: &CallEvent) -> Result<Directive, DispatchError> {
        match &event.kind {
            CallEventKind::Incoming => self.incoming_call(),
            CallEventKind::Speech(speech) => self.speech_turn(speech),
            CallEventKind::FollowUp(speech) => self.follow_up_turn(speech),
            CallEventKind::StatusUpdate(_) => Err(DispatchError::Unsupported(event.kind.name())),
        }
    }

    /// Greet the caller and listen for the first question
    pub fn incoming_call(&self) -> Result<Directive, DispatchError> {
        Ok(Directive::Gather {
            lead: None,
            prompt: format!(
                "Hello! You've reached {}. How can I help you today?",
                self.business
            ),
            action: self.callback(SPEECH_PATH)?,
            on_silence: Box::new(self.transfer(Handoff::Silence)),
        })
    }

    /// Answer the first question, or hand the caller to the operator
    pub fn speech_turn(&self, speech: &SpeechResult) -> Result<Directive, DispatchError> {
        if speech.is_empty() || speech.effective_confidence() < self.confidence_threshold {
            debug!(
                "Low confidence speech ({:?}, {:?}), transferring",
                speech.text, speech.confidence
            );
            return Ok(self.transfer(Handoff::Unheard));
        }

        if let Some(keyword) = self.matcher.forward_keyword(&speech.text) {
            debug!("Forward keyword {:?} matched, transferring", keyword);
            return Ok(self.transfer(Handoff::Requested));
        }

        let topic = Topic::classify(&speech.text);
        debug!("Answering with {} reply", topic.name());

        Ok(Directive::Gather {
            lead: Some(topic.reply(&self.business)),
            prompt: FOLLOW_UP_PROMPT.to_string(),
            action: self.callback(FOLLOW_UP_PATH)?,
            on_silence: Box::new(Directive::EndCall {
                message: self.closing(),
            }),
        })
    }

    /// Route the answer to "anything else?"
    pub fn follow_up_turn(&self, speech: &SpeechResult) -> Result<Directive, DispatchError> {
        if speech.is_empty() {
            return Ok(Directive::EndCall {
                message: self.closing(),
            });
        }

        let intent = self.matcher.classify_follow_up(&speech.text);
        debug!("Follow-up intent: {:?}", intent);

        Ok(match intent {
            FollowUpIntent::Forward | FollowUpIntent::Transfer => {
                self.transfer(Handoff::Requested)
            }
            FollowUpIntent::Goodbye => Directive::EndCall {
                message: self.closing(),
            },
            FollowUpIntent::Other => {
                let topic = Topic::classify(&speech.text);
                Directive::EndCall {
                    message: format!("{} {}", topic.reply(&self.business), self.closing()),
                }
            }
        })
    }

    /// Apology and transfer used whenever composition fails
    pub fn fallback(&self) -> Directive {
        self.transfer(Handoff::Failure)
    }

    /// Static sample for checking text-to-speech
    pub fn test_tts(&self) -> Directive {
        Directive::Speak {
            text: format!(
                "This is a test of the {} AI phone system. Text-to-speech is working correctly!",
                self.business
            ),
        }
    }

    fn closing(&self) -> String {
        format!(
            "Thank you for calling {}. Have a great day. Goodbye!",
            self.business
        )
    }

    /// Transfer to the operator, or end politely when there is none
    fn transfer(&self, handoff: Handoff) -> Directive {
        match &self.operator {
            Some(operator) => Directive::Transfer {
                message: Some(handoff.message().to_string()),
                operator: operator.clone(),
            },
            None if handoff.apologizes() => Directive::EndCall {
                message: format!("I'm sorry. {}", OPERATOR_UNAVAILABLE),
            },
            None => Directive::EndCall {
                message: OPERATOR_UNAVAILABLE.to_string(),
            },
        }
    }

    /// Absolute callback URL when the public base is configured, else the path
    fn callback(&self, path: &str) -> Result<String, DispatchError> {
        let Some(base) = &self.callback_base else {
            return Ok(path.to_string());
        };

        let url = Url::parse(base).map_err(|source| DispatchError::CallbackUrl {
            base: base.clone(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DispatchError::CallbackScheme(base.clone()));
        }

        Ok(format!("{}{}", base.trim_end_matches('/'), path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StatusUpdate;
    use crate::keywords::DEFAULT_FORWARD_KEYWORDS;

    fn config() -> Config {
        let mut config = Config::default();
        config.business.name = "Green Slice".to_string();
        config.business.operator_phone = Some("+15557654321".to_string());
        config
    }

    fn event(kind: CallEventKind) -> CallEvent {
        CallEvent {
            caller: "+15551112222".to_string(),
            called: "+15553334444".to_string(),
            call_sid: "CA123".to_string(),
            kind,
        }
    }

    fn speech(text: &str, confidence: Option<f32>) -> SpeechResult {
        SpeechResult::new(text, confidence)
    }

    #[test]
    fn test_incoming_call_gathers_speech() {
        let composer = Composer::new(&config());
        let directive = composer.incoming_call().unwrap();

        let Directive::Gather {
            prompt,
            action,
            on_silence,
            ..
        } = directive
        else {
            panic!("expected gather");
        };
        assert!(prompt.contains("Green Slice"));
        assert_eq!(action, "/process_speech");
        assert!(on_silence.is_transfer());
    }

    #[test]
    fn test_pricing_question_opens_follow_up() {
        let composer = Composer::new(&config());
        let directive = composer
            .speech_turn(&speech("How much does lawn care cost?", Some(0.9)))
            .unwrap();

        let Directive::Gather { lead, action, .. } = directive else {
            panic!("expected gather");
        };
        assert_eq!(lead, Some(Topic::Pricing.reply("Green Slice")));
        assert_eq!(action, "/process_followup");
    }

    #[test]
    fn test_empty_speech_transfers_with_apology() {
        let composer = Composer::new(&config());
        let directive = composer.speech_turn(&speech("", Some(0.0))).unwrap();

        let Directive::Transfer {
            message, operator, ..
        } = directive
        else {
            panic!("expected transfer");
        };
        assert!(message.unwrap().starts_with("I'm sorry"));
        assert_eq!(operator, "+15557654321");
    }

    #[test]
    fn test_low_confidence_always_transfers() {
        let composer = Composer::new(&config());
        for text in ["How much does it cost?", "thank you, bye", "what are your hours"] {
            for confidence in [Some(0.0), Some(0.29), None] {
                let directive = composer.speech_turn(&speech(text, confidence)).unwrap();
                assert!(directive.is_transfer(), "{} {:?}", text, confidence);
            }
        }
        // the threshold itself is not low
        let directive = composer
            .speech_turn(&speech("what are your hours", Some(0.3)))
            .unwrap();
        assert!(directive.is_gather());
    }

    #[test]
    fn test_forward_keyword_transfers_without_apology() {
        let composer = Composer::new(&config());
        for text in ["I want to speak to the MANAGER", "I need a refund", "billing question"] {
            let directive = composer.speech_turn(&speech(text, Some(0.95))).unwrap();
            let Directive::Transfer { message, .. } = directive else {
                panic!("expected transfer for {}", text);
            };
            assert!(!message.unwrap_or_default().contains("sorry"));
        }
    }

    #[test]
    fn test_every_forward_keyword_transfers() {
        let composer = Composer::new(&config());
        for keyword in DEFAULT_FORWARD_KEYWORDS {
            let transcript = format!("Well, {} here", keyword.to_uppercase());

            let directive = composer
                .speech_turn(&speech(&transcript, Some(0.95)))
                .unwrap();
            assert_eq!(
                directive,
                Directive::Transfer {
                    message: Some(FORWARD_MESSAGE.to_string()),
                    operator: "+15557654321".to_string(),
                },
                "speech turn: {}",
                keyword
            );

            let directive = composer
                .follow_up_turn(&speech(&transcript, Some(0.95)))
                .unwrap();
            assert!(directive.is_transfer(), "follow-up turn: {}", keyword);
        }
    }

    #[test]
    fn test_unmatched_transcript_gets_default_reply() {
        let composer = Composer::new(&config());
        let directive = composer
            .speech_turn(&speech("tell me something nice", Some(0.8)))
            .unwrap();
        assert_eq!(
            directive.spoken_text()[0],
            Topic::Default.reply("Green Slice")
        );
    }

    #[test]
    fn test_follow_up_goodbye_ends_call() {
        let composer = Composer::new(&config());
        let directive = composer
            .follow_up_turn(&speech("thank you, bye", None))
            .unwrap();

        let Directive::EndCall { message } = directive else {
            panic!("expected end call");
        };
        assert!(message.contains("Thank you for calling Green Slice"));
    }

    #[test]
    fn test_follow_up_transfer_phrase() {
        let composer = Composer::new(&config());
        let directive = composer
            .follow_up_turn(&speech("can you connect me please", None))
            .unwrap();
        assert!(directive.is_transfer());
    }

    #[test]
    fn test_follow_up_question_answers_then_closes() {
        let composer = Composer::new(&config());
        let directive = composer
            .follow_up_turn(&speech("what are your hours", Some(0.9)))
            .unwrap();

        let Directive::EndCall { message } = directive else {
            panic!("expected end call");
        };
        assert!(message.starts_with(&Topic::Hours.reply("Green Slice")));
        assert!(message.ends_with("Goodbye!"));
    }

    #[test]
    fn test_follow_up_silence_closes() {
        let composer = Composer::new(&config());
        let directive = composer.follow_up_turn(&speech("  ", None)).unwrap();
        assert!(directive.is_end_call());
    }

    #[test]
    fn test_transfer_without_operator_ends_call() {
        let mut config = config();
        config.business.operator_phone = None;
        let composer = Composer::new(&config);

        let directive = composer.speech_turn(&speech("", None)).unwrap();
        let Directive::EndCall { message } = directive else {
            panic!("expected end call");
        };
        assert!(message.contains("isn't available"));
        assert!(message.starts_with("I'm sorry."));

        let directive = composer
            .speech_turn(&speech("I want a refund", Some(0.9)))
            .unwrap();
        assert_eq!(
            directive,
            Directive::EndCall {
                message: OPERATOR_UNAVAILABLE.to_string(),
            }
        );

        let Directive::EndCall { message } = composer.fallback() else {
            panic!("expected end call");
        };
        assert!(message.starts_with("I'm sorry."));
    }

    #[test]
    fn test_absolute_callbacks_with_base_url() {
        let mut config = config();
        config.server.webhook_base_url = Some("https://ivr.example.com/".to_string());
        let composer = Composer::new(&config);

        let Directive::Gather { action, .. } = composer.incoming_call().unwrap() else {
            panic!("expected gather");
        };
        assert_eq!(action, "https://ivr.example.com/process_speech");
    }

    #[test]
    fn test_bad_base_url_falls_back() {
        let mut config = config();
        config.server.webhook_base_url = Some("ftp://ivr.example.com".to_string());
        let composer = Composer::new(&config);

        let outcome = composer.respond(&event(CallEventKind::Incoming));
        assert!(outcome.is_fallback());
        assert_eq!(outcome.directive(), &composer.fallback());

        config.server.webhook_base_url = Some("not a url".to_string());
        let outcome = Composer::new(&config).respond(&event(CallEventKind::Incoming));
        assert!(matches!(
            outcome,
            Outcome::Fallback {
                cause: DispatchError::CallbackUrl { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_status_update_is_not_composed() {
        let composer = Composer::new(&config());
        let status = StatusUpdate {
            status: "completed".to_string(),
            duration_secs: Some(30),
        };
        let result = composer.compose(&event(CallEventKind::StatusUpdate(status)));
        assert!(matches!(result, Err(DispatchError::Unsupported("status-update"))));
    }

    #[test]
    fn test_respond_passes_through_success() {
        let composer = Composer::new(&config());
        let outcome = composer.respond(&event(CallEventKind::Speech(speech(
            "I need to schedule an appointment",
            Some(0.7),
        ))));
        assert!(!outcome.is_fallback());
        assert_eq!(
            outcome.directive().spoken_text()[0],
            Topic::Scheduling.reply("Green Slice")
        );
    }
}
