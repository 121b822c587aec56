//! Sender name and address from a `From`-style header value.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Optional (possibly quoted) display name, then an optionally angle-bracketed
/// address, anchored at the start of the input.
static CONTACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: This is a static literal regex pattern; compilation cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r#"^(?:"?([^"]*)"?\s)?<?([\w.\-]+@[\w.\-]+)>?"#).expect("contact regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

/// Empty name and email when no address is found at the start of `from`.
pub fn extract_contact(from: &str) -> Contact {
    let Some(caps) = CONTACT_RE.captures(from) else {
        return Contact::default();
    };
    let group = |i| caps.get(i).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    Contact { name: group(1), email: group(2) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(from: &str) -> (String, String) {
        let c = extract_contact(from);
        (c.name, c.email)
    }

    #[test]
    fn test_quoted_name_and_bracketed_address() {
        assert_eq!(pair(r#""Jane Doe" <jane@example.com>"#), ("Jane Doe".into(), "jane@example.com".into()));
    }

    #[test]
    fn test_bare_address() {
        assert_eq!(pair("noreply@example.com"), ("".into(), "noreply@example.com".into()));
    }

    #[test]
    fn test_no_address() {
        assert_eq!(pair("not an address"), ("".into(), "".into()));
        assert_eq!(pair(""), ("".into(), "".into()));
    }

    #[test]
    fn test_unquoted_name() {
        assert_eq!(pair("GitHub <noreply@github.com>"), ("GitHub".into(), "noreply@github.com".into()));
    }

    #[test]
    fn test_dotted_and_dashed_address() {
        assert_eq!(pair("<first.last-x@mail.example-corp.com>").1, "first.last-x@mail.example-corp.com");
    }
}
