//! # Lexiscope Knowledge
//!
//! The tiered knowledge engine:
//!
//! - [`KnowledgeIndex`]: keyword indexes for the topic tier and the general tier
//! - [`CurriculumIndex`]: unit matching plus a cached on-demand content fetch
//! - [`TieredComposer`]: merges tier lookups into one bounded context string
//! - [`KnowledgeEngine`]: the session-owned facade over all of the above
//! - [`grading`]: tolerant short-answer checking for exercises
//! - [`JsonBundle`]: a file-backed loader for local runs and tests

pub mod builtin;
pub mod bundle;
pub mod composer;
pub mod curriculum;
pub mod engine;
pub mod grading;
pub mod index;
pub mod progress;
pub mod render;

pub use bundle::JsonBundle;
pub use composer::{ComposeOptions, KnowledgeContext, TieredComposer};
pub use curriculum::{CurriculumIndex, Focus, format_content};
pub use engine::{EngineBuilder, EngineStats, KnowledgeEngine};
pub use grading::{AnswerOutcome, ExerciseTracker, Grade, grade_answer};
pub use index::{IndexStats, KnowledgeIndex, MistakePattern, Tier};
pub use progress::SessionProgress;
