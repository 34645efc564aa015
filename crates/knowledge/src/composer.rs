//! Tiered context composition.
//!
//! Merges per-tier lookups into one bounded context string:
//!
//! 1. **Topic tier** (scraped, avatar-scoped): grammar, vocabulary, mistake
//! 2. **General tier** (built-in): only for categories the topic tier left empty
//! 3. **Curriculum**: independent of both tiers, never suppressed
//! 4. **Session progress**: optional trailing note
//!
//! Suppression is per category: a topic grammar hit hides general grammar
//! but general vocabulary still renders when the topic tier had none.

use lexiscope_core::VocabularyEntry;
use serde::Serialize;
use tracing::debug;

use crate::index::{KnowledgeIndex, trim_word};
use crate::render::{self, truncate_chars};

const SECTION_SEPARATOR: &str = "\n\n";

// ── Types ─────────────────────────────────────────────────────────────────

/// Which categories to look up for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComposeOptions {
    pub grammar: bool,
    pub vocabulary: bool,
    pub mistakes: bool,
    pub curriculum: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            grammar: true,
            vocabulary: true,
            mistakes: true,
            curriculum: true,
        }
    }
}

/// Per-query contributions, one optional block per category and tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KnowledgeContext {
    pub topic_grammar: Option<String>,
    pub topic_vocabulary: Option<String>,
    pub topic_mistake: Option<String>,
    pub general_grammar: Option<String>,
    pub general_vocabulary: Option<String>,
    pub general_mistake: Option<String>,
    pub curriculum: Option<String>,
    pub progress: Option<String>,
}

impl KnowledgeContext {
    pub fn has_topic_context(&self) -> bool {
        self.topic_grammar.is_some() || self.topic_vocabulary.is_some() || self.topic_mistake.is_some()
    }

    pub fn has_general_context(&self) -> bool {
        self.general_grammar.is_some()
            || self.general_vocabulary.is_some()
            || self.general_mistake.is_some()
    }

    /// Blocks in render order. A general block is left out whenever the topic
    /// tier supplied the same category.
    pub fn sections(&self) -> Vec<&str> {
        let general_grammar = self.general_grammar.as_ref().filter(|_| self.topic_grammar.is_none());
        let general_vocabulary = self
            .general_vocabulary
            .as_ref()
            .filter(|_| self.topic_vocabulary.is_none());
        let general_mistake = self.general_mistake.as_ref().filter(|_| self.topic_mistake.is_none());

        [
            self.topic_grammar.as_ref(),
            self.topic_vocabulary.as_ref(),
            self.topic_mistake.as_ref(),
            general_grammar,
            general_vocabulary,
            general_mistake,
            self.curriculum.as_ref(),
            self.progress.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect()
    }

    /// Join the sections with blank lines, cut to `max_chars` characters.
    pub fn render(&self, max_chars: usize) -> String {
        let joined = self.sections().join(SECTION_SEPARATOR);
        truncate_chars(&joined, max_chars).to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.sections().is_empty()
    }

    /// Per-category breakdown as pretty JSON.
    pub fn to_json(&self) -> lexiscope_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ── Composer ──────────────────────────────────────────────────────────────

/// Looks up the two keyword tiers for a query.
pub struct TieredComposer<'a> {
    topic: &'a KnowledgeIndex,
    general: &'a KnowledgeIndex,
    min_vocab_word_len: usize,
}

impl<'a> TieredComposer<'a> {
    pub fn new(topic: &'a KnowledgeIndex, general: &'a KnowledgeIndex, min_vocab_word_len: usize) -> Self {
        Self {
            topic,
            general,
            min_vocab_word_len,
        }
    }

    /// Fill the topic and general blocks of a fresh context.
    /// Curriculum and progress are left for the caller.
    pub fn compose(&self, text: &str, options: &ComposeOptions) -> KnowledgeContext {
        let mut ctx = KnowledgeContext::default();
        let topic_tier = self.topic.tier();
        let general_tier = self.general.tier();

        if !self.topic.is_empty() {
            if options.grammar {
                ctx.topic_grammar = render::grammar(topic_tier, &self.topic.lookup_grammar(text));
            }
            if options.vocabulary {
                ctx.topic_vocabulary =
                    render::vocabulary(topic_tier, &self.vocabulary_hits(self.topic, text));
            }
            if options.mistakes {
                ctx.topic_mistake = render::mistake(topic_tier, &self.topic.check_mistakes(text));
            }
            debug!(
                grammar = ctx.topic_grammar.is_some(),
                vocabulary = ctx.topic_vocabulary.is_some(),
                mistake = ctx.topic_mistake.is_some(),
                "Topic tier lookup"
            );
        }

        if options.grammar && ctx.topic_grammar.is_none() {
            ctx.general_grammar = render::grammar(general_tier, &self.general.lookup_grammar(text));
        }
        if options.vocabulary && ctx.topic_vocabulary.is_none() {
            ctx.general_vocabulary =
                render::vocabulary(general_tier, &self.vocabulary_hits(self.general, text));
        }
        if options.mistakes && ctx.topic_mistake.is_none() {
            ctx.general_mistake = render::mistake(general_tier, &self.general.check_mistakes(text));
        }
        debug!(
            grammar = ctx.general_grammar.is_some(),
            vocabulary = ctx.general_vocabulary.is_some(),
            mistake = ctx.general_mistake.is_some(),
            "General tier lookup"
        );

        ctx
    }

    /// Vocabulary entries for each long-enough word of `text`, deduplicated.
    fn vocabulary_hits<'i>(&self, index: &'i KnowledgeIndex, text: &str) -> Vec<&'i VocabularyEntry> {
        let mut hits: Vec<&VocabularyEntry> = Vec::new();
        for word in text.split_whitespace().map(trim_word) {
            if word.chars().count() < self.min_vocab_word_len {
                continue;
            }
            if let Some(entry) = index.lookup_vocabulary(word) {
                if !hits.iter().any(|h| std::ptr::eq(*h, entry)) {
                    hits.push(entry);
                }
            }
        }
        hits
    }
}
