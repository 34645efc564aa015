//! Knowledge records and the bulk loader trait.
//!
//! These are the typed forms of the grammar, vocabulary, and mistake records
//! a knowledge tier is built from. Every field carries an explicit serde
//! default so a sparse record from the store still loads; aliases accept the
//! camelCase / legacy field names the store emits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::curriculum::CurriculumIndexEntry;
use crate::error::LoadError;

/// CEFR proficiency level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
    /// Missing or unrecognized level.
    #[default]
    Unrated,
}

impl CefrLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
            Self::Unrated => "unrated",
        }
    }

    pub fn is_rated(&self) -> bool {
        !matches!(self, Self::Unrated)
    }
}

impl From<String> for CefrLevel {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&str> for CefrLevel {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "A1" => Self::A1,
            "A2" => Self::A2,
            "B1" => Self::B1,
            "B2" => Self::B2,
            "C1" => Self::C1,
            "C2" => Self::C2,
            _ => Self::Unrated,
        }
    }
}

impl From<CefrLevel> for String {
    fn from(value: CefrLevel) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One correct/incorrect example pair for a grammar rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGrammarExample")]
pub struct GrammarExample {
    pub correct: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incorrect: Option<String>,
}

impl GrammarExample {
    pub fn new(correct: impl Into<String>, incorrect: Option<&str>) -> Self {
        Self {
            correct: correct.into(),
            incorrect: incorrect.map(str::to_string),
        }
    }
}

/// Scraped sources store examples as bare strings, curated ones as pairs.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawGrammarExample {
    Text(String),
    Pair {
        #[serde(default)]
        correct: String,
        #[serde(default)]
        incorrect: Option<String>,
    },
}

impl From<RawGrammarExample> for GrammarExample {
    fn from(raw: RawGrammarExample) -> Self {
        match raw {
            RawGrammarExample::Text(correct) => Self {
                correct,
                incorrect: None,
            },
            RawGrammarExample::Pair { correct, incorrect } => Self {
                correct,
                incorrect: incorrect.filter(|s| !s.is_empty()),
            },
        }
    }
}

/// A grammar rule with examples and indexing keywords.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarRule {
    /// Stable identity; filled from the name at index time when missing.
    #[serde(default, alias = "_id")]
    pub id: String,

    #[serde(default, alias = "rule")]
    pub name: String,

    /// "tenses", "articles", "word_order", ...
    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub level: CefrLevel,

    #[serde(default, alias = "explanationEn")]
    pub explanation: String,

    #[serde(default)]
    pub formula: String,

    #[serde(default)]
    pub examples: Vec<GrammarExample>,

    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_category() -> String {
    "general".into()
}

/// A vocabulary word with its target-language form and usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    /// Source-language term.
    #[serde(default)]
    pub term: String,

    /// Target-language term.
    #[serde(default, alias = "termDe", alias = "term_de")]
    pub term_target: String,

    #[serde(default)]
    pub definition: String,

    #[serde(default, alias = "part_of_speech")]
    pub part_of_speech: String,

    #[serde(default)]
    pub level: CefrLevel,

    #[serde(default, alias = "exampleSentence")]
    pub example: String,

    /// Topical grouping ("business", "travel", ...). Empty = ungrouped.
    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// How often a mistake shows up in learners' speech.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    VeryCommon,
    #[default]
    Common,
    Occasional,
}

/// An uncompiled mistake pattern as delivered by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeRecord {
    #[serde(default, alias = "_id")]
    pub id: String,

    /// Regular expression, matched case-insensitively.
    pub pattern: String,

    #[serde(default, alias = "correct")]
    pub correction: String,

    #[serde(default, alias = "explanationEn")]
    pub explanation: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub frequency: Frequency,
}

/// Everything one tier is built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBundle {
    /// Identifier of the source (knowledge base id, file name) for logging.
    #[serde(default)]
    pub source: String,

    #[serde(default, alias = "grammarRules")]
    pub grammar: Vec<GrammarRule>,

    #[serde(default)]
    pub vocabulary: Vec<VocabularyEntry>,

    #[serde(default, alias = "mistakePatterns")]
    pub mistakes: Vec<MistakeRecord>,

    /// Topic keywords used for relevance checks (topic tier only).
    #[serde(default)]
    pub topic_keywords: Vec<String>,
}

impl KnowledgeBundle {
    pub fn is_empty(&self) -> bool {
        self.grammar.is_empty()
            && self.vocabulary.is_empty()
            && self.mistakes.is_empty()
            && self.topic_keywords.is_empty()
    }
}

/// The one-shot bulk loader that seeds the indexes at session start.
///
/// Absence of data is not an error: return `Ok(None)` / `Ok(vec![])`.
#[async_trait]
pub trait KnowledgeLoader: Send + Sync {
    /// Loader name for logging (e.g. "json_bundle", "store").
    fn name(&self) -> &str;

    /// Built-in / general knowledge for the general tier.
    async fn load_general(&self) -> Result<Option<KnowledgeBundle>, LoadError>;

    /// Scraped, avatar-scoped knowledge for the topic tier.
    async fn load_topic(&self, avatar_id: &str) -> Result<Vec<KnowledgeBundle>, LoadError>;

    /// Curriculum units linked to the avatar.
    async fn load_curriculum_index(
        &self,
        avatar_id: &str,
    ) -> Result<Vec<CurriculumIndexEntry>, LoadError>;
}
