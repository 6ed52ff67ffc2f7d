//! Exported deck documents (CrowdAnki JSON).
//!
//! Only the parts of the document this crate reads or writes are typed. Everything
//! else, at deck level and at note level, is carried through `extra` so a
//! load/save cycle leaves unknown keys as they were.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::config::DeckSettings;

/// Errors that can occur while loading or saving a deck.
#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("deck JSON error")]
    Json(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, DeckError>;

/// Number of positional fields every vocabulary note carries.
pub const FIELD_COUNT: usize = 12;

/// Tags the enrichment workflow reads and writes.
pub mod tags {
    /// The note's content comes from a completed enrichment call.
    pub const ENRICHED: &str = "Enriched";
    /// The note's sense is no longer reported; kept for manual review.
    pub const UNUSED: &str = "Unused";
}

/// The twelve positional fields of a vocabulary note, by meaning.
///
/// Serialized as a JSON array in slot order. Slots 3 and 8 have no meaning for
/// this tool and are only kept so the array round-trips.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFields {
    /// Slot 0: English meanings
    pub english: String,
    /// Slot 1: the Thai word, also the grouping key for enrichment
    pub thai: String,
    /// Slot 2: romanized pronunciation
    pub phonetic: String,
    reserved_3: String,
    /// Slot 4: part of speech (the note's sense)
    pub part_of_speech: String,
    /// Slot 5: context and usage
    pub context: String,
    /// Slot 6: free-form notes
    pub notes: String,
    /// Slot 7: Thai example sentences
    pub thai_sentences: String,
    reserved_8: String,
    /// Slot 9: English example sentences
    pub english_sentences: String,
    /// Slot 10: near-synonyms and contrasts
    pub near_synonyms: String,
    /// Slot 11: classifier word
    pub classifier: String,
}

impl NoteFields {
    /// Reset every slot, reserved ones included, to the empty string.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Borrow the fields in slot order.
    pub fn slots(&self) -> [&str; FIELD_COUNT] {
        [
            &self.english,
            &self.thai,
            &self.phonetic,
            &self.reserved_3,
            &self.part_of_speech,
            &self.context,
            &self.notes,
            &self.thai_sentences,
            &self.reserved_8,
            &self.english_sentences,
            &self.near_synonyms,
            &self.classifier,
        ]
    }

    /// Build from values in slot order.
    pub fn from_slots(slots: [String; FIELD_COUNT]) -> Self {
        let [
            english,
            thai,
            phonetic,
            reserved_3,
            part_of_speech,
            context,
            notes,
            thai_sentences,
            reserved_8,
            english_sentences,
            near_synonyms,
            classifier,
        ] = slots;
        Self {
            english,
            thai,
            phonetic,
            reserved_3,
            part_of_speech,
            context,
            notes,
            thai_sentences,
            reserved_8,
            english_sentences,
            near_synonyms,
            classifier,
        }
    }
}

impl Serialize for NoteFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.slots())
    }
}

impl<'de> Deserialize<'de> for NoteFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let values = Vec::<String>::deserialize(deserializer)?;
        let slots: [String; FIELD_COUNT] = values
            .try_into()
            .map_err(|v: Vec<String>| D::Error::invalid_length(v.len(), &"exactly 12 note fields"))?;
        Ok(Self::from_slots(slots))
    }
}

fn default_note_type() -> String {
    "Note".to_string()
}

/// One flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "__type__", default = "default_note_type")]
    pub kind: String,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub note_model_uuid: Option<String>,
    pub fields: NoteFields,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Note {
    /// A blank note for a newly discovered sense.
    ///
    /// The guid stays unset; the importing application assigns one.
    pub fn empty(template: &DeckSettings) -> Self {
        Self {
            kind: template.note_type.clone(),
            guid: None,
            note_model_uuid: Some(template.new_note_model_uuid.clone()),
            fields: NoteFields::default(),
            tags: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Append `tag` unless it is already present. Returns whether it was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Guid for display, `-` when unset.
    pub fn display_id(&self) -> &str {
        self.guid.as_deref().unwrap_or("-")
    }
}

/// A whole deck document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Deck {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a deck from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Pretty JSON, Thai text left unescaped.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the whole deck to `path`.
    ///
    /// The document is written to a sibling temp file first and renamed over
    /// the destination, so the file on disk is always a complete snapshot.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = self.to_json_string()?;
        let tmp = temp_path(path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        tracing::debug!("Saved {} notes to {:?}", self.notes.len(), path);
        Ok(())
    }

    /// Indices of notes whose Thai word is `word`.
    pub fn indices_for_word(&self, word: &str) -> Vec<usize> {
        self.notes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.fields.thai == word)
            .map(|(i, _)| i)
            .collect()
    }

    /// Append a note and return its index.
    pub fn push_note(&mut self, note: Note) -> usize {
        self.notes.push(note);
        self.notes.len() - 1
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
