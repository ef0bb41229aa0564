//! Keyword matching over caller transcripts
//!
//! Matching is case-insensitive substring containment: no stemming, no fuzzy
//! matching, no scoring.

/// Phrases that send a caller straight to the operator
pub const DEFAULT_FORWARD_KEYWORDS: &[&str] = &[
    "emergency",
    "urgent",
    "complaint",
    "manager",
    "owner",
    "supervisor",
    "cancel",
    "refund",
    "problem",
    "issue",
    "speak to someone",
    "human",
    "representative",
    "billing",
    "payment issue",
];

/// Follow-up answers asking for a person
pub const TRANSFER_PHRASES: &[&str] = &[
    "transfer",
    "connect me",
    "speak to",
    "talk to",
    "real person",
    "operator",
    "yes please",
];

/// Follow-up answers that end the call
pub const GOODBYE_PHRASES: &[&str] = &[
    "goodbye",
    "bye",
    "thank you",
    "thanks",
    "that's all",
    "that is all",
    "no thanks",
    "nothing else",
    "hang up",
];

/// A list of trigger phrases, stored lower-cased
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    phrases: Vec<String>,
}

impl KeywordSet {
    /// Build a set; blank phrases are dropped so they never match everything
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// First phrase contained in the transcript
    pub fn first_match(&self, transcript: &str) -> Option<&str> {
        let transcript = transcript.to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| transcript.contains(phrase.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, transcript: &str) -> bool {
        self.first_match(transcript).is_some()
    }
}

/// How to route the answer to the follow-up prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpIntent {
    Forward,
    Transfer,
    Goodbye,
    Other,
}

/// Forward, transfer and goodbye lists, checked in that order
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    forward: KeywordSet,
    transfer: KeywordSet,
    goodbye: KeywordSet,
}

impl KeywordMatcher {
    /// Use the configured forward keywords with the built-in follow-up lists
    pub fn new<I, S>(forward_keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            forward: KeywordSet::new(forward_keywords),
            transfer: KeywordSet::new(TRANSFER_PHRASES),
            goodbye: KeywordSet::new(GOODBYE_PHRASES),
        }
    }

    pub fn should_forward(&self, transcript: &str) -> bool {
        self.forward.matches(transcript)
    }

    pub fn forward_keyword<'a>(&'a self, transcript: &str) -> Option<&'a str> {
        self.forward.first_match(transcript)
    }

    pub fn classify_follow_up(&self, transcript: &str) -> FollowUpIntent {
        if self.forward.matches(transcript) {
            FollowUpIntent::Forward
        } else if self.transfer.matches(transcript) {
            FollowUpIntent::Transfer
        } else if self.goodbye.matches(transcript) {
            FollowUpIntent::Goodbye
        } else {
            FollowUpIntent::Other
        }
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_FORWARD_KEYWORDS)
    }
}
