//! pulse-sentiment — the prompt-driven sentiment classification contract.
//!
//! A [`SentimentVocabulary`] constrains the labels, [`prompt`] renders the
//! instruction, the backend answers in free text and [`parser`] recovers a
//! [`ClassificationResult`] field by field.

pub mod assist;
pub mod batch;
pub mod chat;
pub mod classifier;
pub mod contact;
pub mod parser;
pub mod prompt;
pub mod vocabulary;

pub use assist::{CleanTarget, Responder, TextCleaner};
pub use batch::{classify_batch, DEFAULT_CONCURRENCY};
pub use chat::ChatSession;
pub use classifier::{ClassifierConfig, SentimentClassifier};
pub use contact::{extract_contact, Contact};
pub use parser::{parse_reply, ParseOptions};
pub use prompt::{PromptStyle, Surface};
pub use pulse_common::ClassificationResult;
pub use vocabulary::{SentimentVocabulary, VocabularyError, VocabularyPreset};
