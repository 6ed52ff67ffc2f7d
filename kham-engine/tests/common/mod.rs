//! Shared fixtures: a scripted model and deck builders.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use kham_engine::Deck;
use kham_engine::model::{CardEnricher, Enrichment, ModelError, SenseClassifier, SenseReport};
use serde_json::json;

/// Kind of failure the scripted model should produce.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Quota,
    Server,
    Malformed,
}

impl Failure {
    fn to_error(self) -> ModelError {
        match self {
            Failure::Quota => ModelError::QuotaExhausted("Your credit balance is too low".into()),
            Failure::Server => ModelError::Api {
                status: 500,
                message: "internal error".into(),
            },
            Failure::Malformed => ModelError::MalformedResponse("expected value".into()),
        }
    }
}

/// A model that answers from a script and records every call.
#[derive(Default)]
pub struct ScriptedModel {
    senses: HashMap<String, Vec<String>>,
    classify_failures: HashMap<String, Failure>,
    enrich_failures: HashMap<(String, String), Failure>,
    pub calls: RefCell<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn senses(mut self, word: &str, senses: &[&str]) -> Self {
        self.senses
            .insert(word.to_string(), senses.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn fail_classify(mut self, word: &str, failure: Failure) -> Self {
        self.classify_failures.insert(word.to_string(), failure);
        self
    }

    pub fn fail_enrich(mut self, word: &str, sense: &str, failure: Failure) -> Self {
        self.enrich_failures
            .insert((word.to_string(), sense.to_string()), failure);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn classified_words(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("classify:").map(str::to_string))
            .collect()
    }

    pub fn enrich_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("enrich:"))
            .collect()
    }
}

impl SenseClassifier for ScriptedModel {
    async fn classify(&self, word: &str) -> Result<SenseReport, ModelError> {
        self.calls.borrow_mut().push(format!("classify:{word}"));
        if let Some(failure) = self.classify_failures.get(word) {
            return Err(failure.to_error());
        }
        let senses = self.senses.get(word).cloned().ok_or_else(|| ModelError::Api {
            status: 404,
            message: format!("no script for {word}"),
        })?;
        Ok(SenseReport {
            thai_input: word.to_string(),
            parts_of_speech: senses,
        })
    }
}

impl CardEnricher for ScriptedModel {
    async fn enrich(&self, word: &str, sense: &str) -> Result<Enrichment, ModelError> {
        self.calls.borrow_mut().push(format!("enrich:{word}:{sense}"));
        if let Some(failure) = self
            .enrich_failures
            .get(&(word.to_string(), sense.to_string()))
        {
            return Err(failure.to_error());
        }
        Ok(card(word, sense))
    }
}

/// Deterministic card content for `word` as `sense`.
pub fn card(word: &str, sense: &str) -> Enrichment {
    Enrichment {
        thai: word.to_string(),
        romanization: format!("rom({word})"),
        english_translation: vec![format!("{word} as {sense}"), "second meaning".to_string()],
        context_usage: format!("- <strong>Meaning 1:</strong> {sense} usage"),
        near_synonyms: "N/A".to_string(),
        part_of_speech: sense.to_string(),
        classifier: "N/A".to_string(),
        example_sentences_thai: vec![format!("{word}มาก")],
        example_sentences_english: vec![format!("very {sense}")],
        notes: format!("notes for {word}"),
    }
}

/// Build a deck from `(guid, word, sense, tags)` tuples. Slot 0 holds `old-<guid>`.
pub fn deck_of(notes: &[(&str, &str, &str, &[&str])]) -> Deck {
    let notes: Vec<_> = notes
        .iter()
        .map(|(guid, word, sense, tags)| {
            json!({
                "__type__": "Note",
                "guid": guid,
                "note_model_uuid": "model-existing",
                "fields": [format!("old-{guid}"), word, "", "", sense, "old context", "", "", "", "", "", ""],
                "tags": tags,
                "flags": 0
            })
        })
        .collect();
    let value = json!({
        "__type__": "Deck",
        "name": "Thai vocabulary",
        "notes": notes,
        "media_files": []
    });
    serde_json::from_value(value).unwrap()
}
