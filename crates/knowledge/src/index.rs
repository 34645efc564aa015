//! Keyword-indexed knowledge for one tier.
//!
//! A [`KnowledgeIndex`] is built once from one or more [`KnowledgeBundle`]s
//! and is read-only afterwards, so lookups take `&self` and need no locking.
//! The same shape serves both the topic tier (scraped, avatar-scoped) and
//! the general tier (built-in baseline).

use lexiscope_core::{
    CefrLevel, Frequency, GrammarRule, KnowledgeBundle, MistakeRecord, PatternError, Similarity,
    VocabularyEntry,
};
use regex_lite::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Upper bound on rules returned by one grammar lookup.
pub const MAX_GRAMMAR_RESULTS: usize = 5;

/// Multi-word grammar terms looked up as a unit when they occur in a query.
const GRAMMAR_PHRASES: &[&str] = &[
    "present perfect",
    "past simple",
    "present simple",
    "future tense",
    "conditional",
    "passive voice",
    "past participle",
    "gerund",
    "infinitive",
    "modal verb",
    "phrasal verb",
    "relative clause",
    "article",
    "preposition",
    "conjunction",
];

/// Which tier an index serves. Decides the render headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Tier 1: scraped, topic-specific knowledge.
    Topic,
    /// Tier 2: built-in general knowledge.
    General,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::General => "general",
        }
    }
}

/// A mistake record with its pattern compiled (case-insensitive).
#[derive(Debug, Clone)]
pub struct MistakePattern {
    pub id: String,
    regex: Regex,
    pub correction: String,
    pub explanation: String,
    pub category: String,
    pub frequency: Frequency,
}

impl MistakePattern {
    pub fn compile(record: &MistakeRecord) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(&record.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| PatternError::Invalid {
                pattern: record.pattern.clone(),
                reason: e.to_string(),
            })?;

        let id = if record.id.is_empty() {
            record.pattern.clone()
        } else {
            record.id.clone()
        };

        Ok(Self {
            id,
            regex,
            correction: record.correction.clone(),
            explanation: record.explanation.clone(),
            category: record.category.clone(),
            frequency: record.frequency,
        })
    }

    /// The pattern source text.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Entry counts for logging and stats output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub sources: usize,
    pub grammar_rules: usize,
    pub vocabulary_entries: usize,
    pub mistake_patterns: usize,
    pub topic_keywords: usize,
    /// Patterns that failed to compile and were dropped.
    pub dropped_patterns: usize,
}

#[derive(Debug)]
pub struct KnowledgeIndex {
    tier: Tier,
    name_similarity: Similarity,
    sources: Vec<String>,

    grammar: Vec<GrammarRule>,
    grammar_by_keyword: HashMap<String, Vec<usize>>,
    grammar_by_category: BTreeMap<String, Vec<usize>>,

    vocabulary: Vec<VocabularyEntry>,
    vocab_by_term: HashMap<String, usize>,
    vocab_by_target: HashMap<String, usize>,
    vocab_by_level: HashMap<CefrLevel, Vec<usize>>,
    vocab_by_category: HashMap<String, Vec<usize>>,

    mistakes: Vec<MistakePattern>,
    topic_keywords: Vec<String>,
    dropped_patterns: usize,
}

impl KnowledgeIndex {
    /// An index with no entries; every lookup misses.
    pub fn empty(tier: Tier) -> Self {
        Self {
            tier,
            name_similarity: Similarity::new(0.6),
            sources: Vec::new(),
            grammar: Vec::new(),
            grammar_by_keyword: HashMap::new(),
            grammar_by_category: BTreeMap::new(),
            vocabulary: Vec::new(),
            vocab_by_term: HashMap::new(),
            vocab_by_target: HashMap::new(),
            vocab_by_level: HashMap::new(),
            vocab_by_category: HashMap::new(),
            mistakes: Vec::new(),
            topic_keywords: Vec::new(),
            dropped_patterns: 0,
        }
    }

    /// Build an index from bundles. `name_similarity` gates the fuzzy
    /// rule-name fallback of [`lookup_grammar`](Self::lookup_grammar).
    pub fn build(
        tier: Tier,
        bundles: impl IntoIterator<Item = KnowledgeBundle>,
        name_similarity: Similarity,
    ) -> Self {
        let mut index = Self {
            name_similarity,
            ..Self::empty(tier)
        };
        for bundle in bundles {
            index.add_bundle(bundle);
        }

        let stats = index.stats();
        info!(
            tier = tier.as_str(),
            sources = stats.sources,
            grammar = stats.grammar_rules,
            vocabulary = stats.vocabulary_entries,
            mistakes = stats.mistake_patterns,
            dropped = stats.dropped_patterns,
            "Knowledge index built"
        );
        index
    }

    fn add_bundle(&mut self, bundle: KnowledgeBundle) {
        let source = if bundle.source.is_empty() {
            format!("{}_{}", self.tier.as_str(), self.sources.len())
        } else {
            bundle.source
        };

        for rule in bundle.grammar {
            self.add_grammar_rule(rule);
        }
        for entry in bundle.vocabulary {
            self.add_vocabulary(entry);
        }
        for record in &bundle.mistakes {
            match MistakePattern::compile(record) {
                Ok(pattern) => self.mistakes.push(pattern),
                Err(e) => {
                    warn!(source = %source, error = %e, "Dropping mistake pattern");
                    self.dropped_patterns += 1;
                }
            }
        }
        self.topic_keywords.extend(
            bundle
                .topic_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty()),
        );

        self.sources.push(source);
    }

    fn add_grammar_rule(&mut self, mut rule: GrammarRule) {
        if rule.id.is_empty() {
            rule.id = slug(&rule.name);
        }
        if rule.id.is_empty() {
            debug!("Skipping grammar rule without id or name");
            return;
        }
        if self.grammar.iter().any(|r| r.id == rule.id) {
            debug!(id = %rule.id, "Skipping duplicate grammar rule");
            return;
        }

        let idx = self.grammar.len();
        for keyword in &rule.keywords {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            let rules = self.grammar_by_keyword.entry(keyword).or_default();
            if !rules.contains(&idx) {
                rules.push(idx);
            }
        }
        self.grammar_by_category
            .entry(rule.category.trim().to_lowercase())
            .or_default()
            .push(idx);
        self.grammar.push(rule);
    }

    fn add_vocabulary(&mut self, entry: VocabularyEntry) {
        let term = entry.term.trim().to_lowercase();
        if term.is_empty() {
            return;
        }

        let idx = self.vocabulary.len();
        self.vocab_by_term.insert(term, idx);
        let target = entry.term_target.trim().to_lowercase();
        if !target.is_empty() {
            self.vocab_by_target.insert(target, idx);
        }
        self.vocab_by_level.entry(entry.level).or_default().push(idx);
        if !entry.category.is_empty() {
            self.vocab_by_category
                .entry(entry.category.to_lowercase())
                .or_default()
                .push(idx);
        }
        self.vocabulary.push(entry);
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn is_empty(&self) -> bool {
        self.grammar.is_empty() && self.vocabulary.is_empty() && self.mistakes.is_empty()
    }

    /// Grammar rules relevant to a query, at most [`MAX_GRAMMAR_RESULTS`].
    ///
    /// Query words and known grammar phrases are looked up in the keyword
    /// index, then category names found in the query add their rules. Only
    /// when both miss are rule names compared fuzzily against the query.
    pub fn lookup_grammar(&self, query: &str) -> Vec<&GrammarRule> {
        if self.grammar.is_empty() {
            return Vec::new();
        }

        let query = query.to_lowercase();
        let mut hits: Vec<usize> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut push = |idx: usize, hits: &mut Vec<usize>| {
            if seen.insert(idx) {
                hits.push(idx);
            }
        };

        let words = query.split_whitespace().map(trim_word).filter(|w| !w.is_empty());
        let phrases = GRAMMAR_PHRASES
            .iter()
            .copied()
            .filter(|phrase| query.contains(phrase));
        for term in words.chain(phrases) {
            if let Some(rules) = self.grammar_by_keyword.get(term) {
                for &idx in rules {
                    push(idx, &mut hits);
                }
            }
        }

        for (category, rules) in &self.grammar_by_category {
            if category.is_empty() {
                continue;
            }
            let spaced = category.replace('_', " ");
            if query.contains(category.as_str()) || query.contains(spaced.as_str()) {
                for &idx in rules {
                    push(idx, &mut hits);
                }
            }
        }

        if hits.is_empty() {
            for (idx, rule) in self.grammar.iter().enumerate() {
                if self.name_similarity.exceeds(&query, &rule.name.to_lowercase()) {
                    push(idx, &mut hits);
                }
            }
        }

        hits.truncate(MAX_GRAMMAR_RESULTS);
        hits.into_iter().map(|idx| &self.grammar[idx]).collect()
    }

    /// Exact, case-insensitive term lookup: source language first, then target.
    pub fn lookup_vocabulary(&self, term: &str) -> Option<&VocabularyEntry> {
        let key = term.trim().to_lowercase();
        self.vocab_by_term
            .get(&key)
            .or_else(|| self.vocab_by_target.get(&key))
            .map(|&idx| &self.vocabulary[idx])
    }

    /// All mistake patterns found in `text`, in load order.
    pub fn check_mistakes(&self, text: &str) -> Vec<&MistakePattern> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.mistakes.iter().filter(|m| m.is_match(text)).collect()
    }

    pub fn vocabulary_by_level(&self, level: CefrLevel) -> Vec<&VocabularyEntry> {
        self.vocab_by_level
            .get(&level)
            .map(|ids| ids.iter().map(|&idx| &self.vocabulary[idx]).collect())
            .unwrap_or_default()
    }

    pub fn vocabulary_by_category(&self, category: &str) -> Vec<&VocabularyEntry> {
        self.vocab_by_category
            .get(&category.to_lowercase())
            .map(|ids| ids.iter().map(|&idx| &self.vocabulary[idx]).collect())
            .unwrap_or_default()
    }

    pub fn grammar_by_category(&self, category: &str) -> Vec<&GrammarRule> {
        self.grammar_by_category
            .get(&category.to_lowercase())
            .map(|ids| ids.iter().map(|&idx| &self.grammar[idx]).collect())
            .unwrap_or_default()
    }

    /// Whether any loaded topic keyword occurs in `text`.
    pub fn is_topic_relevant(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.topic_keywords.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn grammar_rules(&self) -> &[GrammarRule] {
        &self.grammar
    }

    pub fn mistakes(&self) -> &[MistakePattern] {
        &self.mistakes
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            sources: self.sources.len(),
            grammar_rules: self.grammar.len(),
            vocabulary_entries: self.vocabulary.len(),
            mistake_patterns: self.mistakes.len(),
            topic_keywords: self.topic_keywords.len(),
            dropped_patterns: self.dropped_patterns,
        }
    }
}

/// Strip surrounding punctuation, keeping hyphens and apostrophes that
/// belong to grammar keywords like "-ing".
pub(crate) fn trim_word(word: &str) -> &str {
    word.trim_matches(|c: char| c.is_ascii_punctuation() && c != '-' && c != '\'')
}

fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
