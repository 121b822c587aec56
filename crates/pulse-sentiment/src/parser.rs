//! Tolerant recovery of a [`ClassificationResult`] from free-form model text.
//!
//! Each field is located independently by its label, so the lines may come in
//! any order, surrounding chatter is ignored, and a missing or malformed line
//! only costs that one field its value.

use std::sync::LazyLock;

use pulse_common::{ClassificationResult, UNKNOWN_LABEL};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const FINE_GRAINED_LABEL: &str = "Fine-Grained Sentiment:";
pub const EMOTION_LABEL: &str = "Emotion Sentiment:";
pub const THINKING_LABEL: &str = "Thinking:";

/// Rationale used when the reply carries no `Thinking:` line.
pub const NO_REASONING: &str = "No reasoning provided.";

/// Compile a pattern that captures the rest of the labeled line.
///
/// Horizontal whitespace after the colon is skipped; the capture never runs
/// past the end of its line.
fn labeled_line(label: &str) -> Regex {
    // SAFETY: label is one of the literal constants above; compilation cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(&format!(r"{}[^\S\n]*([^\n]*)", regex::escape(label))).expect("labeled line regex")
}

static FINE_GRAINED_RE: LazyLock<Regex> = LazyLock::new(|| labeled_line(FINE_GRAINED_LABEL));
static EMOTION_RE: LazyLock<Regex> = LazyLock::new(|| labeled_line(EMOTION_LABEL));
static THINKING_RE: LazyLock<Regex> = LazyLock::new(|| labeled_line(THINKING_LABEL));

/// Fallbacks applied when a field cannot be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    #[serde(default = "default_label_fallback")]
    pub label_fallback: String,
    /// `""` for the terse variants, [`NO_REASONING`] for the reasoned ones.
    #[serde(default)]
    pub thinking_fallback: String,
}

fn default_label_fallback() -> String { UNKNOWN_LABEL.to_string() }

impl Default for ParseOptions {
    fn default() -> Self {
        Self { label_fallback: default_label_fallback(), thinking_fallback: String::new() }
    }
}

impl ParseOptions {
    pub fn with_thinking_fallback(thinking_fallback: impl Into<String>) -> Self {
        Self { thinking_fallback: thinking_fallback.into(), ..Self::default() }
    }
}

/// Value of the first labeled line with a non-blank remainder.
fn extract(re: &Regex, reply: &str) -> Option<String> {
    re.captures_iter(reply)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Which fields of a reply fell back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Misses {
    pub fine_grained: bool,
    pub emotion: bool,
    pub thinking: bool,
}

impl Misses {
    pub fn any(&self) -> bool {
        self.fine_grained || self.emotion || self.thinking
    }
}

/// Parse a reply and report which fields had to fall back.
pub fn parse_reply_detailed(reply: &str, opts: &ParseOptions) -> (ClassificationResult, Misses) {
    let fine = extract(&FINE_GRAINED_RE, reply);
    let emotion = extract(&EMOTION_RE, reply);
    let thinking = extract(&THINKING_RE, reply);

    let misses = Misses {
        fine_grained: fine.is_none(),
        emotion: emotion.is_none(),
        thinking: thinking.is_none(),
    };
    let result = ClassificationResult {
        emotion_sentiment: emotion.unwrap_or_else(|| opts.label_fallback.clone()),
        fine_grained_sentiment: fine.unwrap_or_else(|| opts.label_fallback.clone()),
        thinking: thinking.unwrap_or_else(|| opts.thinking_fallback.clone()),
    };
    (result, misses)
}

/// Parse a reply. Never fails: unrecoverable fields take their fallback.
pub fn parse_reply(reply: &str, opts: &ParseOptions) -> ClassificationResult {
    parse_reply_detailed(reply, opts).0
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(reply: &str) -> ClassificationResult {
        parse_reply(reply, &ParseOptions::default())
    }

    #[test]
    fn test_exact_grammar() {
        let r = parse("Fine-Grained Sentiment: Urgent\nEmotion Sentiment: Anxious\nThinking: Server is down.");
        assert_eq!(r.as_tuple(), ("Anxious", "Urgent", "Server is down."));
    }

    #[test]
    fn test_values_are_trimmed() {
        let r = parse("Fine-Grained Sentiment:    Neutral   \r\nEmotion Sentiment:\tConfused\r\n");
        assert_eq!(r.fine_grained_sentiment, "Neutral");
        assert_eq!(r.emotion_sentiment, "Confused");
    }

    #[test]
    fn test_capture_stops_at_end_of_line() {
        let r = parse("Thinking: first line\nsecond line\nFine-Grained Sentiment: Positive");
        assert_eq!(r.thinking, "first line");
        assert_eq!(r.fine_grained_sentiment, "Positive");
    }

    #[test]
    fn test_never_crosses_line_break() {
        let r = parse("Emotion Sentiment:\nHappy");
        assert_eq!(r.emotion_sentiment, "Unknown");
    }

    #[test]
    fn test_blank_first_occurrence_is_skipped() {
        let r = parse("Emotion Sentiment:   \nEmotion Sentiment: Sad");
        assert_eq!(r.emotion_sentiment, "Sad");
    }

    #[test]
    fn test_label_mid_line_still_matches() {
        let r = parse("Sure! Fine-Grained Sentiment: Complaint");
        assert_eq!(r.fine_grained_sentiment, "Complaint");
    }

    #[test]
    fn test_wrong_case_and_punctuation_miss() {
        let r = parse("fine-grained sentiment: Positive\nEmotion Sentiment - Happy\nThinking Good");
        assert_eq!(r, ClassificationResult::unknown(""));
    }

    #[test]
    fn test_detailed_reports_misses() {
        let (_, misses) = parse_reply_detailed("Emotion Sentiment: Happy", &ParseOptions::default());
        assert_eq!(misses, Misses { fine_grained: true, emotion: false, thinking: true });
        assert!(misses.any());
    }

    #[test]
    fn test_custom_fallbacks() {
        let opts = ParseOptions { label_fallback: "N/A".into(), thinking_fallback: NO_REASONING.into() };
        let r = parse_reply("", &opts);
        assert_eq!(r.as_tuple(), ("N/A", "N/A", "No reasoning provided."));
    }
}
