//! ivr-core: call webhook dispatcher for the IVR gateway
//!
//! Turns Twilio voice webhook notifications into the next call-control
//! instruction: keyword matching over caller speech, a canned reply table,
//! and a TwiML renderer. Everything here is request-scoped except the
//! immutable [`Config`].

pub mod composer;
pub mod config;
pub mod directive;
pub mod error;
pub mod event;
pub mod keywords;
pub mod replies;
pub mod twiml;

pub use composer::{Composer, Outcome};
pub use config::{
    BusinessConfig, CheckStatus, Config, ConfigCheck, ServerConfig, SpeechConfig, TwilioConfig,
};
pub use directive::Directive;
pub use error::{DispatchError, Error, Result};
pub use event::{CallEvent, CallEventKind, SpeechResult, StatusUpdate, WebhookForm};
pub use keywords::{FollowUpIntent, KeywordMatcher, KeywordSet};
pub use replies::Topic;
pub use twiml::{TwimlRenderer, FALLBACK_TWIML};
