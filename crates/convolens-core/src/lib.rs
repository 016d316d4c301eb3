//! # Convolens Core
//!
//! Conversation analysis pipeline: transcript normalization, the category
//! taxonomy, the hierarchical classifier and the summarizer. Everything in
//! here is provider-agnostic; chat-completion calls go through the
//! `ChatClient` trait from `convolens-llm`.

pub mod classifier;
pub mod normalizer;
pub mod prompt;
pub mod summarizer;
pub mod taxonomy;

pub use classifier::{
    ClassificationPath, ClassifierConfig, ClassifyError, ConversationContext,
    HierarchicalClassifier, LevelOutcome,
};
pub use normalizer::TranscriptNormalizer;
pub use summarizer::Summarizer;
pub use taxonomy::{load_taxonomy, CategoryRow, Taxonomy, TaxonomyError};
