//! Whole-deck enrichment.
//!
//! Words are processed one at a time, strictly in sequence. After each word the
//! full deck is written to the destination, so a crash or an aborted run never
//! loses the words already finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use tracing::{error, info, warn};

use crate::config::DeckSettings;
use crate::deck::{Deck, DeckError, Note, tags};
use crate::model::{CardEnricher, SenseClassifier};
use crate::reconcile::{Reconciler, Reconciliation};

/// Errors that end an enrichment run.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("failed to save deck to {path:?}")]
    Save {
        path: PathBuf,
        #[source]
        source: DeckError,
    },
}

type Result<T> = std::result::Result<T, EnrichError>;

/// Notes grouped by Thai word, in order of first appearance.
pub type WordGroups = IndexMap<String, Vec<usize>>;

/// Group every note by its Thai word.
pub fn group_by_word(deck: &Deck) -> WordGroups {
    let mut groups = WordGroups::new();
    for (index, note) in deck.notes.iter().enumerate() {
        groups
            .entry(note.fields.thai.clone())
            .or_default()
            .push(index);
    }
    groups
}

/// Words with at least one note not yet tagged `Enriched`.
pub fn words_needing_enrichment(deck: &Deck) -> WordGroups {
    group_by_word(deck)
        .into_iter()
        .filter(|(_, indices)| indices.iter().any(|&i| !deck.notes[i].has_tag(tags::ENRICHED)))
        .collect()
}

/// Keep only the notes of `groups`, in group order, and return the regrouped indices.
fn restrict_to(deck: &mut Deck, groups: WordGroups) -> WordGroups {
    let mut notes: Vec<Option<Note>> = std::mem::take(&mut deck.notes)
        .into_iter()
        .map(Some)
        .collect();
    let mut regrouped = WordGroups::new();
    for (word, indices) in groups {
        let kept = indices
            .into_iter()
            .filter_map(|index| notes[index].take())
            .map(|note| deck.push_note(note))
            .collect();
        regrouped.insert(word, kept);
    }
    regrouped
}

/// Cooperative stop request, checked between words.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrichOptions {
    /// Write only the notes of words that needed enrichment
    pub only_updated: bool,
}

/// Outcome for one word.
#[derive(Debug)]
pub enum WordResult {
    Enriched(Reconciliation),
    Failed(String),
}

/// Why a run ended before the last word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    /// Quota or authorization failure; no further call can succeed
    QuotaExhausted(String),
}

/// Summary of an enrichment run.
#[derive(Debug, Default)]
pub struct EnrichReport {
    /// Words that needed enrichment
    pub words_total: usize,
    pub enriched: usize,
    /// `(word, error)` for words skipped after an error
    pub failed: Vec<(String, String)>,
    pub notes_created: usize,
    pub notes_marked_unused: usize,
    pub stop: Option<StopReason>,
}

/// Observer for run progress.
pub trait EnrichProgress {
    fn started(&mut self, _words: usize) {}
    fn word_started(&mut self, _word: &str) {}
    fn word_finished(&mut self, _word: &str, _result: &WordResult) {}
}

impl EnrichProgress for () {}

/// Drives reconciliation across a whole deck.
pub struct EnrichmentDriver<'a, M> {
    model: &'a M,
    template: &'a DeckSettings,
    destination: PathBuf,
    options: EnrichOptions,
    cancel: CancelFlag,
}

impl<'a, M: SenseClassifier + CardEnricher> EnrichmentDriver<'a, M> {
    pub fn new(model: &'a M, template: &'a DeckSettings, destination: impl AsRef<Path>) -> Self {
        Self {
            model,
            template,
            destination: destination.as_ref().to_path_buf(),
            options: EnrichOptions::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_options(mut self, options: EnrichOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn checkpoint(&self, deck: &Deck) -> Result<()> {
        deck.save(&self.destination).map_err(|source| EnrichError::Save {
            path: self.destination.clone(),
            source,
        })
    }

    /// Enrich every word that has a note without the `Enriched` tag.
    ///
    /// Per-word failures are logged and skipped. A quota or authorization
    /// failure stops the run without saving the interrupted word. Only a failed
    /// save is returned as an error.
    pub async fn run(
        &self,
        deck: &mut Deck,
        progress: &mut impl EnrichProgress,
    ) -> Result<EnrichReport> {
        let mut groups = words_needing_enrichment(deck);
        info!("Enriching {} Thai words", groups.len());

        if self.options.only_updated {
            info!("Clearing existing notes so only updated ones appear in output");
            groups = restrict_to(deck, groups);
        }

        let mut report = EnrichReport {
            words_total: groups.len(),
            ..Default::default()
        };
        progress.started(groups.len());
        self.checkpoint(deck)?;

        let reconciler = Reconciler::new(self.model, self.template);
        for (word, indices) in &groups {
            if self.cancel.is_cancelled() {
                warn!("Cancelled before {}", word);
                report.stop = Some(StopReason::Cancelled);
                break;
            }

            progress.word_started(word);
            info!("Start enriching {}", word);

            let result = match reconciler.reconcile(deck, word, indices).await {
                Ok(outcome) => {
                    info!("Finished enriching {}", word);
                    report.enriched += 1;
                    report.notes_created += outcome.created.len();
                    report.notes_marked_unused += outcome.unused.len();
                    WordResult::Enriched(outcome)
                }
                Err(e) if e.is_fatal_for_run() => {
                    error!(
                        "Error from the model while enriching {}, you're probably out of credits: {}",
                        word, e
                    );
                    report.stop = Some(StopReason::QuotaExhausted(e.to_string()));
                    progress.word_finished(word, &WordResult::Failed(e.to_string()));
                    break;
                }
                Err(e) => {
                    error!("Error while enriching {}: {}", word, e);
                    report.failed.push((word.clone(), e.to_string()));
                    WordResult::Failed(e.to_string())
                }
            };

            self.checkpoint(deck)?;
            progress.word_finished(word, &result);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck() -> Deck {
        Deck::from_json_str(
            r#"{"notes": [
                {"guid": "1", "fields": ["", "มาก", "", "", "adverb", "", "", "", "", "", "", ""], "tags": ["Enriched"]},
                {"guid": "2", "fields": ["", "สวย", "", "", "stative verb", "", "", "", "", "", "", ""], "tags": ["Enriched"]},
                {"guid": "3", "fields": ["", "มาก", "", "", "adjective", "", "", "", "", "", "", ""]},
                {"guid": "4", "fields": ["", "หมา", "", "", "noun", "", "", "", "", "", "", ""]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_group_by_word_first_appearance() {
        let groups = group_by_word(&deck());
        let words: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(words, vec!["มาก", "สวย", "หมา"]);
        assert_eq!(groups["มาก"], vec![0, 2]);
    }

    #[test]
    fn test_fully_enriched_words_skipped() {
        let groups = words_needing_enrichment(&deck());
        let words: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(words, vec!["มาก", "หมา"]);
    }

    #[test]
    fn test_restrict_to_regroups() {
        let mut deck = deck();
        let groups = words_needing_enrichment(&deck);
        let regrouped = restrict_to(&mut deck, groups);

        let guids: Vec<&str> = deck.notes.iter().filter_map(|n| n.guid.as_deref()).collect();
        assert_eq!(guids, vec!["1", "3", "4"]);
        assert_eq!(regrouped["มาก"], vec![0, 1]);
        assert_eq!(regrouped["หมา"], vec![2]);
    }

    #[test]
    fn test_cancel_flag_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
