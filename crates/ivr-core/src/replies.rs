//! Canned replies keyed by topic
//!
//! The receptionist has no language model behind it. A transcript is matched
//! against each topic's trigger substrings in table order and the first hit
//! picks the reply; nothing matching falls through to [`Topic::Default`].

/// Subjects the receptionist has a canned answer for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Pricing,
    Scheduling,
    Services,
    Hours,
    Emergency,
    Default,
}

struct ReplyRule {
    topic: Topic,
    triggers: &'static [&'static str],
}

/// Checked top to bottom
const RULES: &[ReplyRule] = &[
    ReplyRule {
        topic: Topic::Pricing,
        triggers: &[
            "price", "pricing", "cost", "how much", "quote", "estimate", "charge", "rates",
        ],
    },
    ReplyRule {
        topic: Topic::Scheduling,
        triggers: &[
            "schedule",
            "appointment",
            "book",
            "available",
            "availability",
            "come out",
        ],
    },
    ReplyRule {
        topic: Topic::Services,
        triggers: &[
            "service", "lawn", "window", "mow", "yard", "clean", "wash", "offer",
        ],
    },
    ReplyRule {
        topic: Topic::Hours,
        triggers: &["hours", "open", "close", "weekend", "what time"],
    },
    ReplyRule {
        topic: Topic::Emergency,
        triggers: &["emergency", "urgent", "storm", "damage", "broken"],
    },
];

impl Topic {
    /// Topic of the first rule with a trigger inside the transcript
    pub fn classify(transcript: &str) -> Self {
        let transcript = transcript.to_lowercase();
        RULES
            .iter()
            .find(|rule| rule.triggers.iter().any(|t| transcript.contains(t)))
            .map(|rule| rule.topic)
            .unwrap_or(Topic::Default)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Topic::Pricing => "pricing",
            Topic::Scheduling => "scheduling",
            Topic::Services => "services",
            Topic::Hours => "hours",
            Topic::Emergency => "emergency",
            Topic::Default => "default",
        }
    }

    /// Spoken answer for this topic
    pub fn reply(&self, business: &str) -> String {
        match self {
            Topic::Pricing => "Our prices depend on the size of your property and the services you need. \
                Lawn mowing usually starts at forty five dollars per visit, and window washing starts at \
                eight dollars per window. We are happy to give you a free estimate."
                .to_string(),
            Topic::Scheduling => "We would be happy to get you on the schedule. We usually have openings \
                within the week, Monday through Saturday, and our team will confirm a time that works for you."
                .to_string(),
            Topic::Services => format!(
                "{} offers lawn mowing, edging, leaf cleanup, seasonal yard care, and interior and \
                 exterior window washing for homes and businesses.",
                business
            ),
            Topic::Hours => "We are open Monday through Friday from 8 AM to 6 PM, and Saturday from \
                9 AM to 3 PM. We are closed on Sundays."
                .to_string(),
            Topic::Emergency => "For urgent situations like storm damage or broken windows, we will do \
                our best to get someone out to you as soon as possible."
                .to_string(),
            Topic::Default => format!(
                "Thanks for your question. {} can help with lawn care and window washing, and our \
                 team can give you more details.",
                business
            ),
        }
    }
}
