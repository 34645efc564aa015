//! # Lexiscope Core
//!
//! Domain types, collaborator traits, and text primitives for the Lexiscope
//! tiered knowledge engine. This crate has **no runtime dependencies** beyond
//! serde and hashing. It defines the domain model that the cache and
//! knowledge crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (bulk loader, curriculum store, vector search)
//! is defined as a trait here. Implementations live at the edges. This enables:
//! - Swapping the persistent store without touching the indexes
//! - Easy testing with mock/stub collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod curriculum;
pub mod error;
pub mod fuzzy;
pub mod key;
pub mod knowledge;
pub mod retrieval;

// Re-export key types at crate root for ergonomics
pub use curriculum::{
    CurriculumContent, CurriculumFetcher, CurriculumIndexEntry, ResponseRecord, Slide,
};
pub use error::{Error, FetchError, LoadError, PatternError, Result};
pub use fuzzy::Similarity;
pub use key::{CacheKey, normalize};
pub use knowledge::{
    CefrLevel, Frequency, GrammarExample, GrammarRule, KnowledgeBundle, KnowledgeLoader,
    MistakeRecord, VocabularyEntry,
};
pub use retrieval::{RetrievedChunk, VectorSearch, format_chunks};
