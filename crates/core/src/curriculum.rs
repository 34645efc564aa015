//! Curriculum records and the curriculum fetch trait.
//!
//! The index entry is deliberately lightweight (counts + keywords); the full
//! [`CurriculumContent`] is fetched lazily, one unit at a time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::knowledge::CefrLevel;

/// Lightweight index entry for one curriculum unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumIndexEntry {
    #[serde(alias = "_id", alias = "contentId")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub topic: String,

    #[serde(default)]
    pub level: CefrLevel,

    #[serde(default)]
    pub exercise_count: usize,

    #[serde(default)]
    pub vocabulary_count: usize,

    #[serde(default)]
    pub grammar_count: usize,

    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Full structured content of a curriculum unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumContent {
    #[serde(default)]
    pub metadata: UnitMetadata,

    #[serde(default)]
    pub content: UnitBody,

    /// Pre-written responses shipped with the unit.
    #[serde(default)]
    pub cached_responses: Vec<ResponseRecord>,

    #[serde(default)]
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub level: CefrLevel,
    #[serde(default)]
    pub topic: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBody {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub grammar_rules: Vec<UnitGrammarRule>,
    #[serde(default)]
    pub vocabulary: Vec<UnitVocabulary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub items: Vec<ExerciseItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub acceptable_answers: Vec<String>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitGrammarRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub formula: String,
    /// The rule statement itself.
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub examples: Vec<UnitExample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitExample {
    #[serde(default)]
    pub correct: String,
    #[serde(default)]
    pub incorrect: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitVocabulary {
    #[serde(default)]
    pub term: String,
    #[serde(default, alias = "termDe")]
    pub term_target: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default, alias = "exampleSentence")]
    pub example: String,
}

/// A pre-written response record (trigger → response).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub trigger: String,
    pub response: String,
    /// When true, `trigger` is a regular expression.
    #[serde(default)]
    pub is_pattern: bool,
    /// Scope tag (e.g. a slide id). Empty = valid in every scope.
    #[serde(default, alias = "context")]
    pub scope: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub audio_url: String,
}

/// A slide of a unit; its explanation backs "explain this" style responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub notes: String,
}

impl Slide {
    /// Explanation text, falling back to speaker notes.
    pub fn explanation_text(&self) -> Option<&str> {
        [self.explanation.as_str(), self.notes.as_str()]
            .into_iter()
            .find(|s| !s.trim().is_empty())
    }
}

/// Fetches full unit content on demand.
#[async_trait]
pub trait CurriculumFetcher: Send + Sync {
    /// `Ok(None)` when the unit has no structured content.
    async fn fetch(&self, unit_id: &str) -> Result<Option<CurriculumContent>, FetchError>;
}
