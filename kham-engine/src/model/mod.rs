//! Language model access for sense classification and card enrichment

pub mod anthropic;
pub mod error;
mod port;
pub mod prompts;
pub mod retry;

pub use anthropic::AnthropicClient;
pub use error::ModelError;
pub use port::{CardEnricher, Enrichment, SenseClassifier, SenseReport};
pub use retry::{RetryingModel, retry_malformed};
