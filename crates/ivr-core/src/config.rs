//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. environment variables (a `.env` file is loaded by the binary first)
//! 2. the `ivr-gateway.toml` config file
//! 3. defaults
//!
//! `${VAR_NAME}` references inside the config file are expanded from the
//! environment before parsing. The resulting [`Config`] is immutable and is
//! shared by reference with the webhook handlers.

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::keywords::DEFAULT_FORWARD_KEYWORDS;

/// Default config file looked up in the working directory
pub const CONFIG_FILE: &str = "ivr-gateway.toml";

const DEMO_ACCOUNT_SID: &str = "demo_account_sid";
const DEMO_AUTH_TOKEN: &str = "demo_auth_token";
const PLACEHOLDER_OPERATOR: &str = "+15551234567";

/// Twilio account credentials
#[derive(Debug, Clone, PartialEq)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Number purchased for this service, if known
    pub phone_number: Option<String>,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: DEMO_ACCOUNT_SID.to_string(),
            auth_token: DEMO_AUTH_TOKEN.to_string(),
            phone_number: None,
        }
    }
}

/// Business identity and call routing
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessConfig {
    /// Display name spoken in greetings
    pub name: String,
    /// Human operator that calls are transferred to
    pub operator_phone: Option<String>,
    /// Phrases that send the caller straight to the operator
    pub forward_keywords: Vec<String>,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: default_business_name(),
            operator_phone: None,
            forward_keywords: default_forward_keywords(),
        }
    }
}

/// Speech recognition and text-to-speech settings
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechConfig {
    /// Transcripts below this confidence go to the operator
    pub confidence_threshold: f32,
    /// Seconds Twilio waits for the caller to start speaking
    pub gather_timeout_secs: u32,
    pub language: String,
    pub voice: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            gather_timeout_secs: default_gather_timeout(),
            language: default_language(),
            voice: default_voice(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Public base URL Twilio uses to reach this service
    pub webhook_base_url: Option<String>,
    /// Reject webhooks without a valid `X-Twilio-Signature`
    pub validate_signatures: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            webhook_base_url: None,
            validate_signatures: false,
        }
    }
}

/// Main configuration for ivr-gateway
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub twilio: TwilioConfig,
    pub business: BusinessConfig,
    pub speech: SpeechConfig,
    pub server: ServerConfig,
}

fn default_business_name() -> String {
    "Green Slice Lawn Care and Window Washing".to_string()
}

fn default_forward_keywords() -> Vec<String> {
    DEFAULT_FORWARD_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_confidence_threshold() -> f32 {
    0.3
}

fn default_gather_timeout() -> u32 {
    5
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_voice() -> String {
    "Polly.Joanna".to_string()
}

fn default_port() -> u16 {
    5000
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Config {
    /// Load from `ivr-gateway.toml` if present, otherwise from the environment only
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config.normalized())
    }

    /// Load a TOML config file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_toml_str(&content, |key| std::env::var(key).ok())?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config.normalized())
    }

    /// Parse TOML content, expanding `${VAR}` references through `lookup`
    fn from_toml_str<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_vars(content, &lookup);
        let toml: TomlConfig = toml::from_str(&expanded)?;

        let twilio = toml.twilio.unwrap_or_default();
        let business = toml.business.unwrap_or_default();
        let speech = toml.speech.unwrap_or_default();
        let server = toml.server.unwrap_or_default();

        let defaults = Self::default();

        Ok(Config {
            twilio: TwilioConfig {
                account_sid: twilio
                    .account_sid
                    .unwrap_or(defaults.twilio.account_sid),
                auth_token: twilio.auth_token.unwrap_or(defaults.twilio.auth_token),
                phone_number: twilio.phone_number,
            },
            business: BusinessConfig {
                name: business.name.unwrap_or(defaults.business.name),
                operator_phone: business.operator_phone,
                forward_keywords: business
                    .forward_keywords
                    .unwrap_or(defaults.business.forward_keywords),
            },
            speech: SpeechConfig {
                confidence_threshold: speech
                    .confidence_threshold
                    .unwrap_or(defaults.speech.confidence_threshold),
                gather_timeout_secs: speech
                    .gather_timeout_secs
                    .unwrap_or(defaults.speech.gather_timeout_secs),
                language: speech.language.unwrap_or(defaults.speech.language),
                voice: speech.voice.unwrap_or(defaults.speech.voice),
            },
            server: ServerConfig {
                port: server.port.unwrap_or(defaults.server.port),
                webhook_base_url: server.webhook_base_url,
                validate_signatures: server
                    .validate_signatures
                    .unwrap_or(defaults.server.validate_signatures),
            },
        })
    }

    /// Apply overrides from an environment-like lookup
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(sid) = lookup("TWILIO_ACCOUNT_SID").and_then(non_empty) {
            self.twilio.account_sid = sid;
        }
        if let Some(token) = lookup("TWILIO_AUTH_TOKEN").and_then(non_empty) {
            self.twilio.auth_token = token;
        }
        if let Some(number) = lookup("TWILIO_PHONE_NUMBER").and_then(non_empty) {
            self.twilio.phone_number = Some(number);
        }

        if let Some(name) = lookup("BUSINESS_NAME").and_then(non_empty) {
            self.business.name = name;
        }
        if let Some(phone) = lookup("OWNER_PHONE").and_then(non_empty) {
            self.business.operator_phone = Some(phone);
        }
        if let Some(keywords) = lookup("FORWARD_KEYWORDS").and_then(non_empty) {
            self.business.forward_keywords = split_list(&keywords);
        }

        if let Some(threshold) = lookup("CONFIDENCE_THRESHOLD").and_then(non_empty) {
            self.speech.confidence_threshold = threshold.parse().map_err(|_| {
                Error::Config(format!("CONFIDENCE_THRESHOLD is not a number: {}", threshold))
            })?;
        }
        if let Some(timeout) = lookup("GATHER_TIMEOUT").and_then(non_empty) {
            self.speech.gather_timeout_secs = timeout.parse().map_err(|_| {
                Error::Config(format!("GATHER_TIMEOUT is not a whole number: {}", timeout))
            })?;
        }
        if let Some(language) = lookup("SPEECH_LANGUAGE").and_then(non_empty) {
            self.speech.language = language;
        }
        if let Some(voice) = lookup("TTS_VOICE").and_then(non_empty) {
            self.speech.voice = voice;
        }

        if let Some(port) = lookup("PORT").and_then(non_empty) {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Some(url) = lookup("WEBHOOK_BASE_URL").and_then(non_empty) {
            self.server.webhook_base_url = Some(url);
        }
        if let Some(validate) = lookup("VALIDATE_SIGNATURES") {
            self.server.validate_signatures = parse_bool(&validate);
        }

        Ok(())
    }

    /// Clamp ranges and drop placeholder values
    fn normalized(mut self) -> Self {
        let threshold = self.speech.confidence_threshold;
        self.speech.confidence_threshold = if threshold.is_nan() {
            default_confidence_threshold()
        } else {
            threshold.clamp(0.0, 1.0)
        };

        // Unset `${VAR}` references expand to empty strings
        self.twilio.phone_number = self.twilio.phone_number.take().and_then(non_empty);
        self.business.operator_phone = self
            .business
            .operator_phone
            .take()
            .and_then(non_empty)
            .filter(|phone| phone != PLACEHOLDER_OPERATOR);
        self.server.webhook_base_url = self
            .server
            .webhook_base_url
            .take()
            .and_then(non_empty)
            .map(|url| url.trim_end_matches('/').to_string());

        self
    }

    /// Running without real Twilio credentials
    pub fn is_demo_mode(&self) -> bool {
        self.twilio.account_sid.is_empty() || self.twilio.account_sid == DEMO_ACCOUNT_SID
    }

    /// Signature validation is on without a real auth token to check against
    pub fn signature_check_unusable(&self) -> bool {
        let token = self.twilio.auth_token.trim();
        self.server.validate_signatures && (token.is_empty() || is_placeholder(token))
    }

    /// Operator number, if one is configured
    pub fn operator_phone(&self) -> Option<&str> {
        self.business.operator_phone.as_deref()
    }

    /// Absolute URL of a webhook path, when the public base URL is known
    pub fn webhook_url(&self, path: &str) -> Option<String> {
        self.server
            .webhook_base_url
            .as_ref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), path))
    }

    /// Check the settings the service needs in production
    pub fn diagnose(&self) -> Vec<ConfigCheck> {
        vec![
            ConfigCheck::secret("TWILIO_ACCOUNT_SID", Some(&self.twilio.account_sid)),
            ConfigCheck::secret("TWILIO_AUTH_TOKEN", Some(&self.twilio.auth_token)),
            ConfigCheck::plain("WEBHOOK_BASE_URL", self.server.webhook_base_url.as_deref()),
            ConfigCheck::plain("OWNER_PHONE", self.business.operator_phone.as_deref()),
            ConfigCheck::plain("BUSINESS_NAME", Some(&self.business.name)),
        ]
    }
}

/// Outcome of checking one configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Missing,
    Placeholder,
}

/// One line of the configuration diagnostic report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    /// Value safe to print (secrets are masked)
    pub display: String,
}

impl ConfigCheck {
    fn plain(name: &'static str, value: Option<&str>) -> Self {
        Self::check(name, value, false)
    }

    fn secret(name: &'static str, value: Option<&str>) -> Self {
        Self::check(name, value, true)
    }

    fn check(name: &'static str, value: Option<&str>, secret: bool) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Self {
                name,
                status: CheckStatus::Missing,
                display: "NOT SET".to_string(),
            },
            Some(v) if is_placeholder(v) => Self {
                name,
                status: CheckStatus::Placeholder,
                display: v.to_string(),
            },
            Some(v) => Self {
                name,
                status: CheckStatus::Ok,
                display: if secret { mask_secret(v) } else { v.to_string() },
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CheckStatus::Ok
    }
}

/// Demo or template values left in place of real settings
pub fn is_placeholder(value: &str) -> bool {
    value.starts_with("demo_") || value.starts_with("your_") || value.contains("localhost")
}

/// Show the first 8 and last 4 characters of a secret
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

/// Expand `${VAR_NAME}` references; unknown variables expand to nothing
fn expand_vars<F>(value: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }

            if let Some(env_value) = lookup(&var_name) {
                result.push_str(&env_value);
            }
        } else {
            result.push(c);
        }
    }

    result
}

// ============================================================================
// TOML file layout
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    twilio: Option<TomlTwilioConfig>,
    business: Option<TomlBusinessConfig>,
    speech: Option<TomlSpeechConfig>,
    server: Option<TomlServerConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlTwilioConfig {
    account_sid: Option<String>,
    auth_token: Option<String>,
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlBusinessConfig {
    name: Option<String>,
    operator_phone: Option<String>,
    forward_keywords: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlSpeechConfig {
    confidence_threshold: Option<f32>,
    gather_timeout_secs: Option<u32>,
    language: Option<String>,
    voice: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlServerConfig {
    port: Option<u16>,
    webhook_base_url: Option<String>,
    validate_signatures: Option<bool>,
}
