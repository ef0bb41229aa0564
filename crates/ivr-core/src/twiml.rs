//! TwiML renderer
//!
//! Serializes a [`Directive`] into the XML document Twilio executes. The
//! renderer holds only voice settings; the same directive always renders to
//! the same bytes.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::config::SpeechConfig;
use crate::directive::Directive;
use crate::error::{Error, Result};

/// Served verbatim when a directive cannot be rendered
pub const FALLBACK_TWIML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "<Response><Say>I&apos;m sorry, there&apos;s a technical issue. ",
    "Please try calling back later.</Say><Hangup/></Response>"
);

/// Seconds the operator's phone rings before the call falls through
const DIAL_TIMEOUT_SECS: u32 = 30;

#[derive(Debug, Clone)]
pub struct TwimlRenderer {
    voice: String,
    language: String,
    gather_timeout: String,
    dial_timeout: String,
}

impl TwimlRenderer {
    pub fn new(speech: &SpeechConfig) -> Self {
        Self {
            voice: speech.voice.clone(),
            language: speech.language.clone(),
            gather_timeout: speech.gather_timeout_secs.to_string(),
            dial_timeout: DIAL_TIMEOUT_SECS.to_string(),
        }
    }

    /// Render a complete `<Response>` document
    pub fn render(&self, directive: &Directive) -> Result<String> {
        let mut writer = Writer::new(Vec::new());

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("Response")))?;
        self.write_directive(&mut writer, directive)?;
        writer.write_event(Event::End(BytesEnd::new("Response")))?;

        Ok(String::from_utf8(writer.into_inner())?)
    }

    /// Render, substituting [`FALLBACK_TWIML`] on failure
    pub fn render_or_fallback(&self, directive: &Directive) -> String {
        match self.render(directive) {
            Ok(xml) => xml,
            Err(e) => {
                tracing::error!("Failed to render {} directive: {}", directive.kind(), e);
                FALLBACK_TWIML.to_string()
            }
        }
    }

    fn write_directive(&self, writer: &mut Writer<Vec<u8>>, directive: &Directive) -> Result<()> {
        match directive {
            Directive::Speak { text } => self.write_say(writer, text),
            Directive::Gather {
                lead,
                prompt,
                action,
                on_silence,
            } => {
                if let Some(lead) = lead {
                    self.write_say(writer, lead)?;
                }

                let gather = BytesStart::new("Gather").with_attributes([
                    ("input", "speech"),
                    ("action", action.as_str()),
                    ("method", "POST"),
                    ("speechTimeout", "auto"),
                    ("timeout", self.gather_timeout.as_str()),
                    ("language", self.language.as_str()),
                ]);
                writer.write_event(Event::Start(gather))?;
                self.write_say(writer, prompt)?;
                writer.write_event(Event::End(BytesEnd::new("Gather")))?;

                // Twilio only reaches the verbs after <Gather> when nothing was said
                self.write_directive(writer, on_silence)
            }
            Directive::Transfer { message, operator } => {
                if let Some(message) = message {
                    self.write_say(writer, message)?;
                }

                // Verbs after an action-less <Dial> run whenever the bridged leg
                // ends, so the document stops here
                let dial =
                    BytesStart::new("Dial").with_attributes([("timeout", self.dial_timeout.as_str())]);
                writer.write_event(Event::Start(dial))?;
                write_text(writer, operator)?;
                writer.write_event(Event::End(BytesEnd::new("Dial")))?;
                Ok(())
            }
            Directive::EndCall { message } => {
                self.write_say(writer, message)?;
                self.write_hangup(writer)
            }
        }
    }

    fn write_say(&self, writer: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
        let say = BytesStart::new("Say").with_attributes([
            ("voice", self.voice.as_str()),
            ("language", self.language.as_str()),
        ]);
        writer.write_event(Event::Start(say))?;
        write_text(writer, text)?;
        writer.write_event(Event::End(BytesEnd::new("Say")))?;
        Ok(())
    }

    fn write_hangup(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        writer.write_event(Event::Empty(BytesStart::new("Hangup")))?;
        Ok(())
    }
}

/// Characters XML 1.0 allows in a document, escaped or not
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn write_text(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    if let Some(c) = text.chars().find(|c| !is_xml_char(*c)) {
        return Err(Error::Render(format!(
            "character {:?} cannot appear in TwiML",
            c
        )));
    }
    writer.write_event(Event::Text(BytesText::new(text)))?;
    Ok(())
}
