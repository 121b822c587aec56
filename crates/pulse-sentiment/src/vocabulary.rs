//! Label sets the model is constrained to choose from.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use pulse_common::ClassificationResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the two label sequences a vocabulary error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSet {
    FineGrained,
    Emotion,
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelSet::FineGrained => f.write_str("fine-grained"),
            LabelSet::Emotion => f.write_str("emotion"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("{set} label set is empty")]
    Empty { set: LabelSet },
    #[error("{set} label set contains '{label}' more than once")]
    Duplicate { set: LabelSet, label: String },
    #[error("unknown vocabulary preset '{0}' (expected support_triage, polarity or emotion_wheel)")]
    UnknownPreset(String),
}

const SUPPORT_TRIAGE_FINE: &[&str] = &[
    "Positive", "Negative", "Neutral",
    "Satisfied", "Frustrated", "Urgent",
    "Informational", "Complaint", "Appreciation",
];

const SUPPORT_TRIAGE_EMOTION: &[&str] = &[
    "Happy", "Angry", "Sad",
    "Excited", "Confused", "Anxious",
    "Grateful", "Impatient", "Hopeful",
];

const POLARITY_FINE: &[&str] = &[
    "Very Positive", "Positive", "Neutral", "Negative", "Very Negative",
];

const EMOTION_WHEEL: &[&str] = &[
    "Joy", "Trust", "Fear", "Surprise", "Sadness", "Disgust", "Anger", "Anticipation",
];

/// Named label sets shipped with the crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyPreset {
    /// 9 support-triage statuses and 9 customer emotions.
    #[default]
    SupportTriage,
    /// 5-point polarity scale in place of the triage statuses.
    Polarity,
    /// 8-label emotion wheel in place of the customer emotions.
    EmotionWheel,
}

impl VocabularyPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            VocabularyPreset::SupportTriage => "support_triage",
            VocabularyPreset::Polarity => "polarity",
            VocabularyPreset::EmotionWheel => "emotion_wheel",
        }
    }
}

impl FromStr for VocabularyPreset {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "support_triage" => Ok(VocabularyPreset::SupportTriage),
            "polarity" => Ok(VocabularyPreset::Polarity),
            "emotion_wheel" => Ok(VocabularyPreset::EmotionWheel),
            _ => Err(VocabularyError::UnknownPreset(s.to_string())),
        }
    }
}

/// Two ordered, non-empty, duplicate-free label sequences.
///
/// Labels keep the casing they were authored with and are rendered into the
/// prompt in order. The vocabulary is a plain value: callers pass it into
/// every classification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVocabulary")]
pub struct SentimentVocabulary {
    fine_grained: Vec<String>,
    emotion: Vec<String>,
}

#[derive(Deserialize)]
struct RawVocabulary {
    fine_grained: Vec<String>,
    emotion: Vec<String>,
}

impl TryFrom<RawVocabulary> for SentimentVocabulary {
    type Error = VocabularyError;

    fn try_from(raw: RawVocabulary) -> Result<Self, Self::Error> {
        Self::new(raw.fine_grained, raw.emotion)
    }
}

fn validate(set: LabelSet, labels: &[String]) -> Result<(), VocabularyError> {
    if labels.is_empty() {
        return Err(VocabularyError::Empty { set });
    }
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(VocabularyError::Duplicate { set, label: label.clone() });
        }
    }
    Ok(())
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

/// `['A', 'B', 'C']`
pub fn render_labels(labels: &[String]) -> String {
    let quoted: Vec<String> = labels.iter().map(|l| format!("'{l}'")).collect();
    format!("[{}]", quoted.join(", "))
}

impl SentimentVocabulary {
    pub fn new<F, E>(fine_grained: F, emotion: E) -> Result<Self, VocabularyError>
    where
        F: IntoIterator,
        F::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let fine_grained: Vec<String> = fine_grained.into_iter().map(Into::into).collect();
        let emotion: Vec<String> = emotion.into_iter().map(Into::into).collect();
        validate(LabelSet::FineGrained, &fine_grained)?;
        validate(LabelSet::Emotion, &emotion)?;
        Ok(Self { fine_grained, emotion })
    }

    pub fn preset(preset: VocabularyPreset) -> Self {
        // Preset tables are static and known to be valid.
        let (fine, emotion) = match preset {
            VocabularyPreset::SupportTriage => (SUPPORT_TRIAGE_FINE, SUPPORT_TRIAGE_EMOTION),
            VocabularyPreset::Polarity => (POLARITY_FINE, SUPPORT_TRIAGE_EMOTION),
            VocabularyPreset::EmotionWheel => (SUPPORT_TRIAGE_FINE, EMOTION_WHEEL),
        };
        Self { fine_grained: owned(fine), emotion: owned(emotion) }
    }

    pub fn support_triage() -> Self { Self::preset(VocabularyPreset::SupportTriage) }
    pub fn polarity() -> Self { Self::preset(VocabularyPreset::Polarity) }
    pub fn emotion_wheel() -> Self { Self::preset(VocabularyPreset::EmotionWheel) }

    pub fn fine_grained(&self) -> &[String] {
        &self.fine_grained
    }

    pub fn emotion(&self) -> &[String] {
        &self.emotion
    }

    pub fn render_fine_grained(&self) -> String {
        render_labels(&self.fine_grained)
    }

    pub fn render_emotion(&self) -> String {
        render_labels(&self.emotion)
    }

    /// Both labels of `result` are members of this vocabulary.
    ///
    /// Diagnostic only: results are never rejected for using labels outside
    /// the vocabulary.
    pub fn covers(&self, result: &ClassificationResult) -> bool {
        self.fine_grained.iter().any(|l| *l == result.fine_grained_sentiment)
            && self.emotion.iter().any(|l| *l == result.emotion_sentiment)
    }
}

impl Default for SentimentVocabulary {
    fn default() -> Self {
        Self::support_triage()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
