//! Cleanup of malformed Thai-word fields.
//!
//! Decks edited by hand tend to pick up HTML wrappers, `&nbsp;` and classifier
//! annotations in the Thai-word field. Each cleaner below targets one of those
//! shapes and only replaces the value when it captures a non-blank Thai payload.

use std::sync::LazyLock;

use regex::Regex;

use crate::deck::Deck;

/// Anything that is neither Thai script (U+0E00-U+0E7F) nor whitespace.
static NON_THAI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\x{0E00}-\x{0E7F}\s]").expect("valid regex"));

/// `ช้าง [ตัว]`: a word followed by its classifier in brackets.
static WITH_CLASSIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<word>[\x{0E00}-\x{0E7F}\s]*)\s*\[[\x{0E00}-\x{0E7F}\s]*\]")
        .expect("valid regex")
});

/// `<div>สวย&nbsp;</div>`
static IN_DIV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<div>(?P<word>[\x{0E00}-\x{0E7F}\s]*)(&nbsp;)?</div>").expect("valid regex")
});

/// `<span style="...">สวย</span>`
static IN_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<span.*>(?P<word>[\x{0E00}-\x{0E7F}\s]*)(&nbsp;)?</span>").expect("valid regex")
});

/// Whether `text` contains characters outside Thai script and whitespace.
pub fn is_non_thai(text: &str) -> bool {
    NON_THAI.is_match(text)
}

fn unwrap_with(re: &Regex, text: &str) -> Option<String> {
    let word = re.captures(text)?.name("word")?.as_str();
    (!word.trim().is_empty()).then(|| word.to_string())
}

/// Run the cleanup pipeline: classifier suffix, `<div>`, `<span>`, then trim.
pub fn clean_thai_word(text: &str) -> String {
    let mut word = text.to_string();
    for re in [&*WITH_CLASSIFIER, &*IN_DIV, &*IN_SPAN] {
        if let Some(unwrapped) = unwrap_with(re, &word) {
            word = unwrapped;
        }
    }
    word.trim().to_string()
}

/// A proposed change to one note's Thai word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordFix {
    /// Position of the note in the deck
    pub index: usize,
    pub guid: Option<String>,
    pub original: String,
    pub cleaned: String,
}

impl WordFix {
    pub fn changes(&self) -> bool {
        self.original != self.cleaned
    }
}

/// Indices of notes whose Thai word contains non-Thai characters.
pub fn non_thai_indices(deck: &Deck) -> Vec<usize> {
    deck.notes
        .iter()
        .enumerate()
        .filter(|(_, n)| is_non_thai(&n.fields.thai))
        .map(|(i, _)| i)
        .collect()
}

/// Compute the cleaned value for every malformed note without touching the deck.
pub fn plan_cleanup(deck: &Deck) -> Vec<WordFix> {
    non_thai_indices(deck)
        .into_iter()
        .map(|index| {
            let note = &deck.notes[index];
            WordFix {
                index,
                guid: note.guid.clone(),
                original: note.fields.thai.clone(),
                cleaned: clean_thai_word(&note.fields.thai),
            }
        })
        .collect()
}

/// Write planned fixes back into the deck.
pub fn apply_cleanup(deck: &mut Deck, fixes: &[WordFix]) {
    for fix in fixes {
        if let Some(note) = deck.notes.get_mut(fix.index) {
            note.fields.thai.clone_from(&fix.cleaned);
        }
    }
}
