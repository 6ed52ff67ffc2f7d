pub mod clean;
pub mod config;
pub mod deck;
pub mod enrich;
pub mod model;
pub mod reconcile;
pub mod sheets;

pub use clean::{WordFix, apply_cleanup, clean_thai_word, is_non_thai, plan_cleanup};
pub use config::Settings;
pub use deck::{Deck, DeckError, Note, NoteFields, tags};
pub use enrich::{
    CancelFlag, EnrichOptions, EnrichProgress, EnrichReport, EnrichmentDriver, StopReason,
    WordResult,
};
pub use model::{AnthropicClient, CardEnricher, ModelError, RetryingModel, SenseClassifier};
pub use reconcile::{Reconciler, Reconciliation};
