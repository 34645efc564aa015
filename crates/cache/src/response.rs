//! Pre-computed response cache.
//!
//! Maps triggers (literal phrases or regular expressions) to ready-made
//! responses so common utterances skip the LLM entirely. Entries are kept
//! sorted by priority, highest first; insertion order breaks ties.

use lexiscope_core::{PatternError, ResponseRecord, Similarity, Slide, normalize};
use regex_lite::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Priority given to auto-generated slide explanation entries.
pub const SLIDE_EXPLANATION_PRIORITY: i32 = 5;

/// Phrases that ask for the current slide to be explained.
const SLIDE_TRIGGERS: &[&str] = &[
    "explain this",
    "what does this mean",
    "what's on this slide",
    "can you explain",
    "i don't understand",
    "was bedeutet das",
    "erkläre das",
];

#[derive(Debug, Clone)]
pub enum Trigger {
    /// Normalized literal phrase.
    Literal(String),
    /// Case-insensitive regular expression, searched anywhere in the input.
    Pattern(Regex),
}

impl Trigger {
    pub fn literal(text: &str) -> Self {
        Self::Literal(normalize(text))
    }

    pub fn pattern(source: &str) -> Result<Self, PatternError> {
        RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map(Self::Pattern)
            .map_err(|e| PatternError::Invalid {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(text) => text,
            Self::Pattern(re) => re.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub trigger: Trigger,
    pub response: String,
    /// Only valid while this scope (e.g. a slide id) is active.
    pub scope: Option<String>,
    pub priority: i32,
    pub audio_url: Option<String>,
}

impl CachedResponse {
    fn from_record(record: &ResponseRecord) -> Result<Self, PatternError> {
        let trigger = if record.is_pattern {
            Trigger::pattern(&record.trigger)?
        } else {
            Trigger::literal(&record.trigger)
        };
        Ok(Self {
            trigger,
            response: record.response.clone(),
            scope: non_empty(&record.scope),
            priority: record.priority,
            audio_url: non_empty(&record.audio_url),
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// How a lookup matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Pattern,
    Fuzzy,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Pattern => "pattern",
            Self::Fuzzy => "fuzzy",
        }
    }
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseHit {
    pub response: String,
    pub audio_url: Option<String>,
    pub priority: i32,
    pub kind: MatchKind,
    /// 1.0 for exact and pattern hits, the ratio for fuzzy hits.
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResponseCacheStats {
    pub entries: usize,
    pub exact_hits: u64,
    pub pattern_hits: u64,
    pub fuzzy_hits: u64,
    pub misses: u64,
}

impl ResponseCacheStats {
    pub fn hits(&self) -> u64 {
        self.exact_hits + self.pattern_hits + self.fuzzy_hits
    }
}

#[derive(Debug, Default)]
struct Counters {
    exact: AtomicU64,
    pattern: AtomicU64,
    fuzzy: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    fn record(&self, kind: Option<MatchKind>) {
        let counter = match kind {
            Some(MatchKind::Exact) => &self.exact,
            Some(MatchKind::Pattern) => &self.pattern,
            Some(MatchKind::Fuzzy) => &self.fuzzy,
            None => &self.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: Vec<CachedResponse>,
    similarity: Similarity,
    counters: Counters,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Similarity::default())
    }
}

impl ResponseCache {
    pub fn new(similarity: Similarity) -> Self {
        Self {
            entries: Vec::new(),
            similarity,
            counters: Counters::default(),
        }
    }

    /// Insert an entry after every entry of equal or higher priority.
    pub fn insert(&mut self, entry: CachedResponse) {
        let pos = self
            .entries
            .partition_point(|e| e.priority >= entry.priority);
        self.entries.insert(pos, entry);
    }

    /// Compile and insert one record. An invalid pattern is rejected.
    pub fn add(&mut self, record: &ResponseRecord) -> Result<(), PatternError> {
        let entry = CachedResponse::from_record(record)?;
        self.insert(entry);
        Ok(())
    }

    /// Load a unit's pre-written responses. Invalid patterns are logged and
    /// skipped; returns how many entries were added.
    pub fn load_lesson_responses(&mut self, records: &[ResponseRecord]) -> usize {
        let mut added = 0;
        for record in records {
            match self.add(record) {
                Ok(()) => added += 1,
                Err(e) => warn!(error = %e, "Dropping cached response with invalid trigger"),
            }
        }
        info!(added, total = self.entries.len(), "Loaded lesson responses");
        added
    }

    /// Add "explain this" style entries for every slide with explanation
    /// text, scoped to that slide.
    pub fn load_slide_explanations(&mut self, slides: &[Slide]) -> usize {
        let mut added = 0;
        for (i, slide) in slides.iter().enumerate() {
            let Some(text) = slide.explanation_text() else {
                continue;
            };
            let scope = slide
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("slide_{i}"));

            for trigger in SLIDE_TRIGGERS {
                self.insert(CachedResponse {
                    trigger: Trigger::literal(trigger),
                    response: text.to_string(),
                    scope: Some(scope.clone()),
                    priority: SLIDE_EXPLANATION_PRIORITY,
                    audio_url: None,
                });
                added += 1;
            }
        }
        debug!(added, "Loaded slide explanations");
        added
    }

    /// Find the best response for an utterance.
    ///
    /// One pass over the entries in priority order. Each entry is tried as an
    /// exact literal, then as a pattern, then as a fuzzy literal, so the
    /// highest-priority entry that matches in any way wins. Scoped entries
    /// are skipped unless their scope equals `active_scope`.
    pub fn lookup(&self, text: &str, active_scope: Option<&str>) -> Option<ResponseHit> {
        let input = normalize(text);
        if input.is_empty() {
            return None;
        }

        let hit = self.in_scope(active_scope).find_map(|entry| {
            [MatchKind::Exact, MatchKind::Pattern, MatchKind::Fuzzy]
                .into_iter()
                .find_map(|kind| self.match_entry(entry, &input, kind))
        });

        self.counters.record(hit.as_ref().map(|h| h.kind));
        if let Some(hit) = &hit {
            info!(kind = hit.kind.as_str(), priority = hit.priority, "Response cache hit");
        }
        hit
    }

    fn in_scope<'a>(
        &'a self,
        active_scope: Option<&'a str>,
    ) -> impl Iterator<Item = &'a CachedResponse> + 'a {
        self.entries
            .iter()
            .filter(move |entry| match entry.scope.as_deref() {
                Some(scope) => active_scope == Some(scope),
                None => true,
            })
    }

    fn match_entry(
        &self,
        entry: &CachedResponse,
        input: &str,
        kind: MatchKind,
    ) -> Option<ResponseHit> {
        let score = match (&entry.trigger, kind) {
            (Trigger::Literal(trigger), MatchKind::Exact) => (trigger == input).then_some(1.0)?,
            (Trigger::Pattern(re), MatchKind::Pattern) => re.is_match(input).then_some(1.0)?,
            (Trigger::Literal(trigger), MatchKind::Fuzzy) => self.similarity.score(input, trigger)?,
            _ => return None,
        };
        Some(ResponseHit {
            response: entry.response.clone(),
            audio_url: entry.audio_url.clone(),
            priority: entry.priority,
            kind,
            score,
        })
    }

    pub fn entries(&self) -> &[CachedResponse] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> ResponseCacheStats {
        ResponseCacheStats {
            entries: self.entries.len(),
            exact_hits: self.counters.exact.load(Ordering::Relaxed),
            pattern_hits: self.counters.pattern.load(Ordering::Relaxed),
            fuzzy_hits: self.counters.fuzzy.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }
}
