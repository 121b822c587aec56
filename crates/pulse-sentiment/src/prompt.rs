//! Instruction prompts for the classification call.

use std::fmt;
use std::str::FromStr;

use pulse_llm::Message;
use serde::{Deserialize, Serialize};

use crate::parser::{EMOTION_LABEL, FINE_GRAINED_LABEL, THINKING_LABEL};
use crate::vocabulary::SentimentVocabulary;

/// How much the model is asked to say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Both labels plus a one-line rationale.
    #[default]
    Reasoned,
    /// Both labels only, one word each.
    Strict,
}

impl FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reasoned" => Ok(PromptStyle::Reasoned),
            "strict" => Ok(PromptStyle::Strict),
            other => Err(format!("unknown prompt style '{other}' (expected reasoned or strict)")),
        }
    }
}

impl fmt::Display for PromptStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptStyle::Reasoned => f.write_str("reasoned"),
            PromptStyle::Strict => f.write_str("strict"),
        }
    }
}

/// Where the text came from; shapes the wording of the task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Email,
    Issue,
    Ticket,
    Chat,
    #[default]
    Generic,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Email => "email",
            Surface::Issue => "issue",
            Surface::Ticket => "ticket",
            Surface::Chat => "chat",
            Surface::Generic => "generic",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Surface::Email => "You accurately classify sentiments with clear reasoning.",
            Surface::Issue => "You classify GitHub issue sentiments accurately.",
            Surface::Ticket => "You classify sentiments accurately for support tickets.",
            Surface::Chat | Surface::Generic => "You accurately classify sentiments.",
        }
    }

    fn subject(&self) -> &'static str {
        match self {
            Surface::Email => "email body",
            Surface::Issue => "GitHub issue description",
            Surface::Ticket => "customer ticket description",
            Surface::Chat => "chat message",
            Surface::Generic => "message",
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            Surface::Email => "Email Body",
            Surface::Issue => "Description",
            Surface::Ticket => "Ticket Description",
            Surface::Chat | Surface::Generic => "Message",
        }
    }
}

/// The user prompt: task, both label lists verbatim, the output grammar, the text.
pub fn classification_prompt(
    text: &str,
    vocab: &SentimentVocabulary,
    surface: Surface,
    style: PromptStyle,
) -> String {
    let fine = vocab.render_fine_grained();
    let emotion = vocab.render_emotion();
    let subject = surface.subject();
    let heading = surface.heading();

    match style {
        PromptStyle::Reasoned => format!(
            "You are a sentiment analysis expert.\n\
             Given the following {subject}, classify its sentiment into:\n\
             - One of these fine-grained sentiments: {fine}\n\
             - One of these emotion-based sentiments: {emotion}\n\
             - Provide a brief reasoning (thinking).\n\
             \n\
             Respond ONLY in this format:\n\
             {FINE_GRAINED_LABEL} <fine-grained sentiment>\n\
             {EMOTION_LABEL} <emotion-based sentiment>\n\
             {THINKING_LABEL} <brief reasoning>\n\
             \n\
             {heading}:\n\
             {text}\n"
        ),
        PromptStyle::Strict => format!(
            "Classify the sentiment of the following {subject}.\n\
             \n\
             Provide:\n\
             - Fine-Grained Sentiment from: {fine}\n\
             - Emotion-Based Sentiment from: {emotion}\n\
             \n\
             Respond strictly in this format and only give one word value:\n\
             {FINE_GRAINED_LABEL} <fine-grained sentiment>\n\
             {EMOTION_LABEL} <emotion-based sentiment>\n\
             \n\
             {heading}:\n\
             {text}\n"
        ),
    }
}

/// `[system, user]` messages for one classification call.
pub fn build_messages(
    text: &str,
    vocab: &SentimentVocabulary,
    surface: Surface,
    style: PromptStyle,
) -> Vec<Message> {
    vec![
        Message::system(surface.system_prompt()),
        Message::user(classification_prompt(text, vocab, surface, style)),
    ]
}

// ── Tests ─────────────────────────────────────────────────────────────────────
