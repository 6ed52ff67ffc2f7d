//! Spreadsheet round trips for manual correction.
//!
//! Two CSV shapes are supported:
//! - Thai-word fixes: `id,current,new`, one row per malformed note, applied by guid.
//! - Part-of-speech relabeling: `current,new`, one row per distinct sense,
//!   applied to every note carrying `current`.

use std::io::{Read, Write};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::clean::non_thai_indices;
use crate::deck::Deck;

/// Errors that can occur while reading or writing correction sheets.
#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),
}

type Result<T> = std::result::Result<T, SheetError>;

/// Value in the `new` column that blanks a part of speech.
pub const BLANK_MARKER: &str = "-";

/// One row of the Thai-word correction sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub new: String,
}

/// One row of the part-of-speech sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseRow {
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub new: String,
}

/// Outcome of applying a Thai-word sheet.
#[derive(Debug, Default)]
pub struct WordImportReport {
    /// Rows applied to a note
    pub updated: Vec<WordRow>,
    /// Rows whose id matched no note
    pub missing: Vec<WordRow>,
}

/// Write every malformed note as `id,current,new` with `new` pre-filled.
pub fn export_words<W: Write>(deck: &Deck, writer: W) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    let indices = non_thai_indices(deck);
    for &index in &indices {
        let note = &deck.notes[index];
        csv.serialize(WordRow {
            id: note.guid.clone().unwrap_or_default(),
            current: note.fields.thai.clone(),
            new: note.fields.thai.clone(),
        })?;
    }
    csv.flush()?;
    Ok(indices.len())
}

/// Apply `new` to the Thai word of the note whose guid equals `id`.
pub fn import_words<R: Read>(deck: &mut Deck, reader: R) -> Result<WordImportReport> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut report = WordImportReport::default();

    for row in csv.deserialize::<WordRow>() {
        let row = row?;
        match deck
            .notes
            .iter_mut()
            .find(|n| n.guid.as_deref() == Some(row.id.as_str()))
        {
            Some(note) => {
                note.fields.thai.clone_from(&row.new);
                tracing::debug!("Updated {} from {} to {}", row.id, row.current, row.new);
                report.updated.push(row);
            }
            None => {
                tracing::warn!("Could not find {} ({})", row.id, row.current);
                report.missing.push(row);
            }
        }
    }

    Ok(report)
}

/// Write each distinct part of speech once, in deck order, with `new` blank.
pub fn export_senses<W: Write>(deck: &Deck, writer: W) -> Result<usize> {
    let senses: IndexSet<&str> = deck
        .notes
        .iter()
        .map(|n| n.fields.part_of_speech.as_str())
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    for sense in &senses {
        csv.serialize(SenseRow {
            current: sense.to_string(),
            new: String::new(),
        })?;
    }
    csv.flush()?;
    Ok(senses.len())
}

/// Rewrite the part of speech of every note matching a row's `current`.
///
/// Rows with an empty `new` are skipped; [`BLANK_MARKER`] clears the sense.
/// Returns the number of notes rewritten.
pub fn import_senses<R: Read>(deck: &mut Deck, reader: R) -> Result<usize> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut rewritten = 0;

    for row in csv.deserialize::<SenseRow>() {
        let row = row?;
        if row.new.is_empty() {
            continue;
        }
        let replacement = if row.new == BLANK_MARKER { "" } else { row.new.as_str() };

        let mut matched = 0;
        for note in deck
            .notes
            .iter_mut()
            .filter(|n| n.fields.part_of_speech == row.current)
        {
            note.fields.part_of_speech = replacement.to_string();
            matched += 1;
        }
        if matched == 0 {
            tracing::warn!("No notes with part of speech '{}'", row.current);
        }
        rewritten += matched;
    }

    Ok(rewritten)
}
