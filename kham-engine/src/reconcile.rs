//! Sense reconciliation for one word.
//!
//! A word may already have several notes, one per sense it was known to have.
//! The classifier's fresh sense list is matched against them:
//!
//! 1. notes whose sense is still reported are re-enriched in place,
//! 2. each newly reported sense takes over the earliest leftover note, or a
//!    freshly minted one once leftovers run out,
//! 3. leftover notes that were not reused are tagged `Unused`, never removed.
//!
//! Senses compare by exact string equality.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexSet;
use tracing::debug;

use crate::config::DeckSettings;
use crate::deck::{Deck, Note, tags};
use crate::model::error::Result;
use crate::model::{CardEnricher, Enrichment, SenseClassifier};

/// Separator between list items inside a single field.
pub const LINE_BREAK: &str = "<br>";

/// Render items as `- item` lines joined with [`LINE_BREAK`].
pub fn bulleted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

/// Overwrite a note with the content for `word` used as `sense`.
///
/// Every slot is cleared first, so slots without a counterpart in the
/// enrichment (3 and 8) end up empty.
pub fn apply_enrichment(note: &mut Note, word: &str, sense: &str, enrichment: &Enrichment) {
    let fields = &mut note.fields;
    fields.clear();
    fields.english = bulleted_list(&enrichment.english_translation);
    fields.thai = word.to_string();
    fields.phonetic.clone_from(&enrichment.romanization);
    fields.part_of_speech = sense.to_string();
    fields.context.clone_from(&enrichment.context_usage);
    fields.notes.clone_from(&enrichment.notes);
    fields.thai_sentences = bulleted_list(&enrichment.example_sentences_thai);
    fields.english_sentences = bulleted_list(&enrichment.example_sentences_english);
    fields.near_synonyms.clone_from(&enrichment.near_synonyms);
    fields.classifier.clone_from(&enrichment.classifier);
    note.add_tag(tags::ENRICHED);
}

/// What reconciling one word did, as deck indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Distinct reported senses, in report order
    pub senses: Vec<String>,
    /// Notes whose sense was still reported, re-enriched in place
    pub refreshed: Vec<usize>,
    /// Leftover notes that took over a newly reported sense
    pub reused: Vec<usize>,
    /// Notes appended for senses that had no note to reuse
    pub created: Vec<usize>,
    /// Leftover notes tagged `Unused`
    pub unused: Vec<usize>,
}

/// Matches a word's notes against its reported senses.
pub struct Reconciler<'a, M> {
    model: &'a M,
    template: &'a DeckSettings,
}

impl<'a, M: SenseClassifier + CardEnricher> Reconciler<'a, M> {
    pub fn new(model: &'a M, template: &'a DeckSettings) -> Self {
        Self { model, template }
    }

    /// Reconcile the notes at `existing` (all notes whose Thai word is `word`).
    ///
    /// On error, enrichments already written stay written and the remaining
    /// steps are skipped. Notes are never removed.
    pub async fn reconcile(
        &self,
        deck: &mut Deck,
        word: &str,
        existing: &[usize],
    ) -> Result<Reconciliation> {
        let report = self.model.classify(word).await?;
        let reported: IndexSet<String> = report.parts_of_speech.into_iter().collect();
        debug!("{} senses reported for {}: {:?}", reported.len(), word, reported);

        let existing_senses: HashSet<&str> = existing
            .iter()
            .map(|&i| deck.notes[i].fields.part_of_speech.as_str())
            .collect();
        let matched: HashSet<String> = reported
            .iter()
            .filter(|sense| existing_senses.contains(sense.as_str()))
            .cloned()
            .collect();

        let (matched_notes, available): (Vec<usize>, Vec<usize>) = existing
            .iter()
            .partition(|&&i| matched.contains(&deck.notes[i].fields.part_of_speech));
        let mut available: VecDeque<usize> = available.into();

        let mut outcome = Reconciliation {
            senses: reported.iter().cloned().collect(),
            ..Default::default()
        };

        for index in matched_notes {
            let sense = deck.notes[index].fields.part_of_speech.clone();
            let enrichment = self.model.enrich(word, &sense).await?;
            apply_enrichment(&mut deck.notes[index], word, &sense, &enrichment);
            outcome.refreshed.push(index);
        }

        for sense in reported.iter().filter(|s| !matched.contains(*s)) {
            let enrichment = self.model.enrich(word, sense).await?;
            let index = match available.pop_front() {
                Some(index) => {
                    outcome.reused.push(index);
                    index
                }
                None => {
                    let index = deck.push_note(Note::empty(self.template));
                    outcome.created.push(index);
                    index
                }
            };
            apply_enrichment(&mut deck.notes[index], word, sense, &enrichment);
        }

        for index in available {
            deck.notes[index].add_tag(tags::UNUSED);
            outcome.unused.push(index);
        }

        Ok(outcome)
    }
}
