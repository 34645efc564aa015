//! Curriculum index and on-demand unit content.
//!
//! The index holds only lightweight metadata per unit and is matched against
//! every utterance. Full unit content is fetched lazily through a
//! [`CurriculumFetcher`] and memoized in an [`LruTtlCache`].

use lexiscope_cache::{CacheStats, LruTtlCache};
use lexiscope_core::{CurriculumContent, CurriculumFetcher, CurriculumIndexEntry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::render::truncate_chars;

/// Units returned by one match.
pub const MAX_MATCHED_UNITS: usize = 2;
/// Examples rendered per unit grammar rule.
pub const MAX_UNIT_EXAMPLES: usize = 3;
/// Vocabulary entries rendered per unit.
pub const MAX_UNIT_VOCABULARY: usize = 15;
/// Items rendered per exercise.
pub const MAX_EXERCISE_ITEMS: usize = 5;

const KEYWORD_SCORE: u32 = 2;
const TRIGGER_SCORE: u32 = 3;

const EXERCISE_TRIGGERS: &[&str] = &["exercise", "übung", "practice", "test", "quiz", "question"];
const GRAMMAR_TRIGGERS: &[&str] = &[
    "grammar",
    "grammatik",
    "rule",
    "tense",
    "modal",
    "verb",
    "conjugat",
];
const VOCABULARY_TRIGGERS: &[&str] = &["vocabulary", "vocab", "word", "vokabel", "wort", "term"];

/// Which sections of a unit to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    All,
    Exercises,
    Grammar,
    Vocabulary,
}

impl Focus {
    /// Pick a focus from what the learner asked for. First family wins.
    pub fn detect(text: &str) -> Self {
        let text = text.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| text.contains(w));

        if mentions(&["exercise", "übung", "practice", "quiz"]) {
            Self::Exercises
        } else if mentions(&["grammar", "grammatik", "rule", "tense"]) {
            Self::Grammar
        } else if mentions(&["vocab", "word", "vokabel", "wort"]) {
            Self::Vocabulary
        } else {
            Self::All
        }
    }

    fn shows_exercises(self) -> bool {
        matches!(self, Self::All | Self::Exercises)
    }

    fn shows_grammar(self) -> bool {
        matches!(self, Self::All | Self::Grammar)
    }

    fn shows_vocabulary(self) -> bool {
        matches!(self, Self::All | Self::Vocabulary)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Exercises => "exercises",
            Self::Grammar => "grammar",
            Self::Vocabulary => "vocabulary",
        }
    }
}

pub struct CurriculumIndex {
    units: Vec<CurriculumIndexEntry>,
    fetcher: Option<Arc<dyn CurriculumFetcher>>,
    cache: LruTtlCache<String, CurriculumContent>,
}

impl CurriculumIndex {
    pub fn new(
        units: Vec<CurriculumIndexEntry>,
        fetcher: Option<Arc<dyn CurriculumFetcher>>,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        let units: Vec<CurriculumIndexEntry> = units
            .into_iter()
            .map(|mut unit| {
                unit.keywords = unit
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                unit
            })
            .collect();

        info!(units = units.len(), "Curriculum index loaded");
        for unit in &units {
            debug!(
                id = %unit.id,
                title = %unit.title,
                level = %unit.level,
                exercises = unit.exercise_count,
                vocabulary = unit.vocabulary_count,
                "Curriculum unit"
            );
        }

        Self {
            units,
            fetcher,
            cache: LruTtlCache::new("curriculum", capacity, ttl),
        }
    }

    pub fn units(&self) -> &[CurriculumIndexEntry] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Up to [`MAX_MATCHED_UNITS`] units relevant to `text`, best first.
    ///
    /// Each contained unit keyword scores 2. Each trigger family present in
    /// the text scores 3 when the unit has content of that kind. Ties keep
    /// index order; units scoring zero are left out.
    pub fn match_query(&self, text: &str) -> Vec<&CurriculumIndexEntry> {
        let text = text.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| text.contains(w));
        let asks_exercise = mentions(EXERCISE_TRIGGERS);
        let asks_grammar = mentions(GRAMMAR_TRIGGERS);
        let asks_vocabulary = mentions(VOCABULARY_TRIGGERS);

        let mut scored: Vec<(u32, &CurriculumIndexEntry)> = self
            .units
            .iter()
            .filter_map(|unit| {
                let mut score = unit
                    .keywords
                    .iter()
                    .filter(|k| text.contains(k.as_str()))
                    .count() as u32
                    * KEYWORD_SCORE;
                if asks_exercise && unit.exercise_count > 0 {
                    score += TRIGGER_SCORE;
                }
                if asks_grammar && unit.grammar_count > 0 {
                    score += TRIGGER_SCORE;
                }
                if asks_vocabulary && unit.vocabulary_count > 0 {
                    score += TRIGGER_SCORE;
                }
                (score > 0).then_some((score, unit))
            })
            .collect();

        // stable: equal scores keep index order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(MAX_MATCHED_UNITS)
            .map(|(_, unit)| unit)
            .collect()
    }

    /// Full content of a unit, from the cache or the fetcher.
    ///
    /// Fetch errors and units without content are logged and yield `None`;
    /// neither is cached.
    pub async fn get_content(&self, unit_id: &str) -> Option<CurriculumContent> {
        let key = unit_id.to_string();
        if let Some(content) = self.cache.get(&key).await {
            debug!(unit = unit_id, "Curriculum content cache hit");
            return Some(content);
        }

        let fetcher = self.fetcher.as_ref()?;
        match fetcher.fetch(unit_id).await {
            Ok(Some(content)) => {
                self.cache.insert(key, content.clone()).await;
                Some(content)
            }
            Ok(None) => {
                debug!(unit = unit_id, "Curriculum unit has no structured content");
                None
            }
            Err(e) => {
                warn!(unit = unit_id, error = %e, "Curriculum fetch failed");
                None
            }
        }
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Available units, for a system prompt.
    pub fn summary(&self) -> String {
        if self.units.is_empty() {
            return "No lesson materials loaded.".into();
        }

        let mut lines = vec!["You have access to the following lesson materials:".to_string()];
        for unit in &self.units {
            lines.push(format!("- {} ({}): {}", unit.title, unit.level, unit.topic));
            let mut details = Vec::new();
            if unit.exercise_count > 0 {
                details.push(format!("{} exercises", unit.exercise_count));
            }
            if unit.grammar_count > 0 {
                details.push(format!("{} grammar rules", unit.grammar_count));
            }
            if unit.vocabulary_count > 0 {
                details.push(format!("{} vocabulary", unit.vocabulary_count));
            }
            if !details.is_empty() {
                lines.push(format!("  Contains: {}", details.join(", ")));
            }
        }
        lines.join("\n")
    }
}

/// Render unit content for prompt injection, at most `max_chars` characters.
pub fn format_content(content: &CurriculumContent, focus: Focus, max_chars: usize) -> String {
    let meta = &content.metadata;
    let body = &content.content;
    let or_unknown = |s: &str| if s.is_empty() { "Unknown".to_string() } else { s.to_string() };

    let mut parts = vec![
        format!("[LESSON: {}]", or_title(&meta.title, "Untitled")),
        format!(
            "Level: {}",
            if meta.level.is_rated() { meta.level.as_str() } else { "Unknown" }
        ),
        format!("Topic: {}", or_unknown(&meta.topic)),
    ];

    if focus.shows_exercises() && !body.exercises.is_empty() {
        parts.push("\n## EXERCISES:".into());
        for exercise in &body.exercises {
            parts.push(format!("\n### {}", or_title(&exercise.title, "Exercise")));
            parts.push(format!("Type: {}", or_title(&exercise.kind, "unknown")));
            parts.push(format!("Instructions: {}", exercise.instructions));
            for item in exercise.items.iter().take(MAX_EXERCISE_ITEMS) {
                parts.push(format!("- Q: {}", item.question));
                parts.push(format!("  A: {}", item.correct_answer));
                if !item.explanation.is_empty() {
                    parts.push(format!("  Explanation: {}", item.explanation));
                }
            }
        }
    }

    if focus.shows_grammar() && !body.grammar_rules.is_empty() {
        parts.push("\n## GRAMMAR RULES:".into());
        for rule in &body.grammar_rules {
            parts.push(format!("\n### {}", or_title(&rule.name, "Rule")));
            parts.push(format!("Category: {}", or_title(&rule.category, "general")));
            parts.push(format!("Formula: {}", rule.formula));
            parts.push(format!("Explanation: {}", rule.rule));
            for example in rule.examples.iter().take(MAX_UNIT_EXAMPLES) {
                parts.push(format!("  Correct: {}", example.correct));
                if let Some(incorrect) = example.incorrect.as_deref().filter(|s| !s.is_empty()) {
                    parts.push(format!("  Incorrect: {incorrect}"));
                }
                if let Some(why) = example.explanation.as_deref().filter(|s| !s.is_empty()) {
                    parts.push(format!("  Why: {why}"));
                }
            }
        }
    }

    if focus.shows_vocabulary() && !body.vocabulary.is_empty() {
        parts.push("\n## VOCABULARY:".into());
        for vocab in body.vocabulary.iter().take(MAX_UNIT_VOCABULARY) {
            parts.push(format!("- {} ({})", vocab.term, vocab.term_target));
            parts.push(format!("  Definition: {}", vocab.definition));
            if !vocab.example.is_empty() {
                parts.push(format!("  Example: {}", vocab.example));
            }
        }
    }

    parts.push("\n[END LESSON]".into());
    let rendered = parts.join("\n");
    truncate_chars(&rendered, max_chars).to_string()
}

fn or_title<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}
