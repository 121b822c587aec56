//! Gmail message resources to [`EmailRecord`] rows.
//!
//! Input is the JSON the Gmail API returns for `users.messages.get` with
//! `format=full`, either one message per document or an array of them.

use std::path::Path;
use std::sync::LazyLock;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use pulse_common::{EmailRecord, Result};
use pulse_sentiment::extract_contact;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

/// Body text used when a message has no decodable body at all.
pub const NO_BODY: &str = "(No body found)";

/// URL-safe alphabet, padding optional.
const GMAIL_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: This is a static literal regex pattern; compilation cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"<[^>]+>").expect("html tag regex")
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: This is a static literal regex pattern; compilation cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"\s+").expect("whitespace regex")
});

// ── Gmail payload shapes ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GmailMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub payload: MessagePart,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<GmailMessage>),
    One(Box<GmailMessage>),
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode Gmail body data. Invalid UTF-8 sequences are replaced.
pub fn decode_body_data(data: &str) -> std::result::Result<String, base64::DecodeError> {
    let bytes = GMAIL_BASE64.decode(data.trim())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Drop HTML tags, collapse whitespace runs to one space, trim.
pub fn strip_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let without_tags = TAG_RE.replace_all(text, "");
    WHITESPACE_RE.replace_all(&without_tags, " ").trim().to_string()
}

fn decoded(part: &MessagePart) -> Option<String> {
    let data = part.body.data.as_deref().filter(|d| !d.is_empty())?;
    match decode_body_data(data) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(mime_type = %part.mime_type, "Skipping undecodable body part: {e}");
            None
        }
    }
}

/// First part of `mime_type` with data, depth first.
fn find_part(parts: &[MessagePart], mime_type: &str) -> Option<String> {
    parts.iter().find_map(|p| {
        if p.mime_type == mime_type {
            if let Some(text) = decoded(p) {
                return Some(text);
            }
        }
        find_part(&p.parts, mime_type)
    })
}

/// Plain text first, then HTML, then the payload's own body.
pub fn select_body(payload: &MessagePart) -> String {
    find_part(&payload.parts, "text/plain")
        .or_else(|| find_part(&payload.parts, "text/html"))
        .or_else(|| decoded(payload))
        .unwrap_or_else(|| NO_BODY.to_string())
}

fn header<'a>(payload: &'a MessagePart, name: &str) -> &'a str {
    payload
        .headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
        .unwrap_or("")
}

impl GmailMessage {
    /// Row with headers, raw body, tag-stripped body and sender contact filled in.
    pub fn to_record(&self) -> EmailRecord {
        let body = select_body(&self.payload);
        let from = header(&self.payload, "From").to_string();
        let contact = extract_contact(&from);
        EmailRecord {
            subject: header(&self.payload, "Subject").to_string(),
            date: header(&self.payload, "Date").to_string(),
            clean_body: strip_html(&body),
            src_name: contact.name,
            src_email: contact.email,
            from,
            body,
            ..EmailRecord::default()
        }
    }
}

/// Parse a Gmail export (array or single message).
pub fn parse_export(json: &str) -> Result<Vec<GmailMessage>> {
    Ok(match serde_json::from_str::<OneOrMany>(json)? {
        OneOrMany::Many(v) => v,
        OneOrMany::One(m) => vec![*m],
    })
}

/// Read a Gmail export file and convert every message to a row.
pub async fn load_export(path: &Path) -> Result<Vec<EmailRecord>> {
    let content = tokio::fs::read_to_string(path).await?;
    let records: Vec<EmailRecord> = parse_export(&content)?.iter().map(GmailMessage::to_record).collect();
    debug!(path = %path.display(), count = records.len(), "Loaded Gmail export");
    Ok(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn enc(s: &str) -> String {
        URL_SAFE_NO_PAD.encode(s)
    }

    fn part(mime: &str, data: Option<&str>) -> MessagePart {
        MessagePart {
            mime_type: mime.into(),
            body: PartBody { data: data.map(enc) },
            ..MessagePart::default()
        }
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello</p>\n\n  <b>world</b>  "), "Hello world");
        assert_eq!(strip_html(""), "");
        assert_eq!(strip_html("   "), "");
    }

    #[test]
    fn test_decode_with_and_without_padding() {
        assert_eq!(decode_body_data("aGk_").unwrap(), "hi?");
        assert_eq!(decode_body_data("aGk=").unwrap(), "hi");
        assert_eq!(decode_body_data("aGk").unwrap(), "hi");
        assert!(decode_body_data("!!!").is_err());
    }

    #[test]
    fn test_plain_text_preferred_over_html() {
        let payload = MessagePart {
            mime_type: "multipart/alternative".into(),
            parts: vec![part("text/html", Some("<p>html</p>")), part("text/plain", Some("plain"))],
            ..MessagePart::default()
        };
        assert_eq!(select_body(&payload), "plain");
    }

    #[test]
    fn test_plain_part_without_data_falls_through_to_html() {
        let payload = MessagePart {
            parts: vec![part("text/plain", None), part("text/html", Some("<i>hey</i>"))],
            ..MessagePart::default()
        };
        assert_eq!(select_body(&payload), "<i>hey</i>");
    }

    #[test]
    fn test_nested_multipart() {
        let inner = MessagePart {
            mime_type: "multipart/alternative".into(),
            parts: vec![part("text/plain", Some("nested"))],
            ..MessagePart::default()
        };
        let payload = MessagePart { parts: vec![part("application/pdf", Some("%PDF")), inner], ..MessagePart::default() };
        assert_eq!(select_body(&payload), "nested");
    }

    #[test]
    fn test_direct_body_and_missing_body() {
        assert_eq!(select_body(&part("text/plain", Some("direct"))), "direct");
        assert_eq!(select_body(&MessagePart::default()), NO_BODY);
    }

    #[test]
    fn test_message_to_record() {
        let json = serde_json::json!({
            "id": "18c",
            "payload": {
                "mimeType": "text/html",
                "headers": [
                    { "name": "From", "value": "\"Jane Doe\" <jane@example.com>" },
                    { "name": "Subject", "value": "Refund" },
                    { "name": "Date", "value": "Mon, 3 Mar 2025 10:00:00 +0000" }
                ],
                "body": { "data": enc("<div>Where is   my refund?</div>") }
            }
        });
        let records: Vec<EmailRecord> = parse_export(&json.to_string()).unwrap().iter().map(GmailMessage::to_record).collect();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.from, "\"Jane Doe\" <jane@example.com>");
        assert_eq!(r.subject, "Refund");
        assert_eq!(r.body, "<div>Where is   my refund?</div>");
        assert_eq!(r.clean_body, "Where is my refund?");
        assert_eq!(r.src_name, "Jane Doe");
        assert_eq!(r.src_email, "jane@example.com");
        assert!(r.emotion_sentiment.is_empty());
    }

    #[test]
    fn test_parse_export_array() {
        let msgs = parse_export(r#"[{"id":"a","payload":{}},{"id":"b","payload":{}}]"#).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].id, "b");
    }
}
