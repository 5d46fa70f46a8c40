//! Minimal TwiML (telephony markup) builder.
//!
//! Only the verbs the call flow needs are supported. Attribute values and
//! text nodes are escaped; URLs are expected to be assembled by the caller
//! with [`encode_component`] for any user-supplied segment.

use std::fmt::Write;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Content type for markup responses.
pub const TWIML_CONTENT_TYPE: &str = "application/xml";

/// A `<Response>` document under construction.
#[derive(Debug, Default, Clone)]
pub struct TwimlResponse {
    verbs: String,
}

impl TwimlResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<Pause length="N"/>`
    pub fn pause(mut self, seconds: u32) -> Self {
        let _ = write!(self.verbs, r#"<Pause length="{seconds}"/>"#);
        self
    }

    /// `<Connect><Stream url="..."/></Connect>`
    pub fn connect_stream(mut self, url: &str) -> Self {
        let _ = write!(
            self.verbs,
            r#"<Connect><Stream url="{}"/></Connect>"#,
            escape_xml(url)
        );
        self
    }

    /// `<Redirect>url</Redirect>`
    pub fn redirect(mut self, url: &str) -> Self {
        let _ = write!(self.verbs, "<Redirect>{}</Redirect>", escape_xml(url));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push_str("<Hangup/>");
        self
    }

    /// `<Dial><Number>number</Number></Dial>`
    pub fn dial_number(mut self, number: &str) -> Self {
        let _ = write!(
            self.verbs,
            "<Dial><Number>{}</Number></Dial>",
            escape_xml(number)
        );
        self
    }

    pub fn build(self) -> String {
        format!("{XML_DECLARATION}<Response>{}</Response>", self.verbs)
    }
}

/// Escape the five XML special characters.
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Form-encode a single path or query component (`+` for spaces).
pub fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
