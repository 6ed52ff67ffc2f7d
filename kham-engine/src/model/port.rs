//! The two capabilities enrichment needs from a language model.

use serde::{Deserialize, Serialize};

use super::error::Result;

/// Grammatical senses reported for one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseReport {
    /// Echo of the word that was classified
    pub thai_input: String,
    /// At least one sense label, e.g. "noun" or "stative verb"
    pub parts_of_speech: Vec<String>,
}

/// Flashcard content for one word in one sense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub thai: String,
    pub romanization: String,
    pub english_translation: Vec<String>,
    /// Labelled usage list, lines already separated by `<br>`
    pub context_usage: String,
    pub near_synonyms: String,
    /// Echo of the requested sense
    pub part_of_speech: String,
    pub classifier: String,
    pub example_sentences_thai: Vec<String>,
    pub example_sentences_english: Vec<String>,
    pub notes: String,
}

/// Reports every grammatical sense a word has.
#[allow(async_fn_in_trait)]
pub trait SenseClassifier {
    async fn classify(&self, word: &str) -> Result<SenseReport>;
}

/// Writes card content for a word used in one specific sense.
#[allow(async_fn_in_trait)]
pub trait CardEnricher {
    async fn enrich(&self, word: &str, sense: &str) -> Result<Enrichment>;
}
