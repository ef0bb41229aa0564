//! Call-control directives
//!
//! A [`Directive`] is the decision for one webhook, independent of the markup
//! Twilio expects. [`crate::twiml::TwimlRenderer`] turns it into TwiML.

/// The next instruction for the call
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Speak and let the document end
    Speak { text: String },

    /// Speak, listen for an answer, and post it to `action`
    Gather {
        /// Spoken before listening starts
        lead: Option<String>,
        /// Spoken while listening; barge-in interrupts it
        prompt: String,
        /// Callback URL or path for the transcript
        action: String,
        /// What happens when the caller says nothing
        on_silence: Box<Directive>,
    },

    /// Bridge the call to the operator; the call ends with the bridge
    Transfer {
        message: Option<String>,
        operator: String,
    },

    /// Speak and hang up
    EndCall { message: String },
}

impl Directive {
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Speak { .. } => "speak",
            Directive::Gather { .. } => "gather",
            Directive::Transfer { .. } => "transfer",
            Directive::EndCall { .. } => "end-call",
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Directive::Transfer { .. })
    }

    pub fn is_gather(&self) -> bool {
        matches!(self, Directive::Gather { .. })
    }

    pub fn is_end_call(&self) -> bool {
        matches!(self, Directive::EndCall { .. })
    }

    /// Every sentence this directive speaks on its main path, in order
    pub fn spoken_text(&self) -> Vec<&str> {
        match self {
            Directive::Speak { text } => vec![text.as_str()],
            Directive::Gather { lead, prompt, .. } => lead
                .as_deref()
                .into_iter()
                .chain(std::iter::once(prompt.as_str()))
                .collect(),
            Directive::Transfer { message, .. } => message.as_deref().into_iter().collect(),
            Directive::EndCall { message } => vec![message.as_str()],
        }
    }
}
