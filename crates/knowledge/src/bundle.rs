//! JSON bundle loader: a file-backed knowledge source.
//!
//! One JSON document stands in for the persistent store. It carries the
//! general bundle, avatar-scoped topic bundles, curriculum units with
//! their full content and free-text passages. It serves [`KnowledgeLoader`],
//! [`CurriculumFetcher`] and a lexical [`VectorSearch`] over the passages.
//!
//! ```json
//! {
//!   "general": { "grammar": [], "mistakes": [] },
//!   "topic": [{ "source": "kb_food", "avatars": ["emma"], "vocabulary": [] }],
//!   "units": [{ "id": "u1", "title": "Modal verbs", "keywords": ["modal"], "content": {} }],
//!   "passages": [{ "collection": "kb_grammar", "text": "Modal verbs express ability." }]
//! }
//! ```
//!
//! An empty or missing `avatars` list makes a section visible to every avatar.

use async_trait::async_trait;
use lexiscope_core::{
    CurriculumContent, CurriculumFetcher, CurriculumIndexEntry, FetchError, KnowledgeBundle,
    KnowledgeLoader, LoadError, RetrievedChunk, VectorSearch, normalize,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const LOADER_NAME: &str = "json_bundle";

#[derive(Debug, Default, Deserialize)]
struct BundleFile {
    #[serde(default)]
    general: Option<KnowledgeBundle>,

    #[serde(default)]
    topic: Vec<TopicSection>,

    #[serde(default)]
    units: Vec<UnitSection>,

    #[serde(default)]
    passages: Vec<PassageSection>,
}

#[derive(Debug, Deserialize)]
struct PassageSection {
    collection: String,
    text: String,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TopicSection {
    #[serde(default)]
    avatars: Vec<String>,

    #[serde(flatten)]
    bundle: KnowledgeBundle,
}

#[derive(Debug, Deserialize)]
struct UnitSection {
    #[serde(default)]
    avatars: Vec<String>,

    #[serde(default)]
    content: Option<CurriculumContent>,

    #[serde(flatten)]
    entry: CurriculumIndexEntry,
}

#[derive(Debug, Clone)]
struct Scoped<T> {
    avatars: Vec<String>,
    item: T,
}

impl<T> Scoped<T> {
    fn visible_to(&self, avatar_id: &str) -> bool {
        self.avatars.is_empty() || self.avatars.iter().any(|a| a == avatar_id)
    }
}

/// Knowledge and curriculum parsed from one JSON document.
#[derive(Debug, Clone, Default)]
pub struct JsonBundle {
    source: String,
    general: Option<KnowledgeBundle>,
    topic: Vec<Scoped<KnowledgeBundle>>,
    units: Vec<Scoped<CurriculumIndexEntry>>,
    contents: HashMap<String, CurriculumContent>,
    passages: Vec<RetrievedChunk>,
}

impl JsonBundle {
    /// Read and parse a bundle file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LoadError::Io(format!("{}: {e}", path.display())))?;
        let bundle = Self::from_json_str(&path.display().to_string(), &raw)?;
        info!(
            path = %path.display(),
            topic_bundles = bundle.topic.len(),
            units = bundle.units.len(),
            passages = bundle.passages.len(),
            "Knowledge bundle loaded"
        );
        Ok(bundle)
    }

    /// Parse a bundle from JSON text. `source` names it in logs and errors.
    pub fn from_json_str(source: &str, json: &str) -> Result<Self, LoadError> {
        let file: BundleFile = serde_json::from_str(json).map_err(|e| LoadError::Corrupt {
            source_name: source.to_string(),
            reason: e.to_string(),
        })?;

        let general = file.general.map(|mut bundle| {
            if bundle.source.is_empty() {
                bundle.source = format!("{source}#general");
            }
            bundle
        });

        let topic = file
            .topic
            .into_iter()
            .enumerate()
            .map(|(i, section)| {
                let mut bundle = section.bundle;
                if bundle.source.is_empty() {
                    bundle.source = format!("{source}#topic{i}");
                }
                Scoped {
                    avatars: section.avatars,
                    item: bundle,
                }
            })
            .collect();

        let mut units = Vec::with_capacity(file.units.len());
        let mut contents = HashMap::new();
        for section in file.units {
            let mut entry = section.entry;
            if let Some(content) = section.content {
                fill_counts(&mut entry, &content);
                contents.insert(entry.id.clone(), content);
            }
            units.push(Scoped {
                avatars: section.avatars,
                item: entry,
            });
        }

        let passages = file
            .passages
            .into_iter()
            .map(|p| RetrievedChunk {
                text: p.text,
                score: 0.0,
                source: p.collection,
                metadata: p.metadata,
            })
            .collect();

        Ok(Self {
            source: source.to_string(),
            general,
            topic,
            units,
            contents,
            passages,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn passage_count(&self) -> usize {
        self.passages.len()
    }
}

/// Query words worth matching: punctuation stripped, longer than two chars.
fn query_terms(query: &str) -> Vec<String> {
    normalize(query)
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Counts left at zero in the index entry are taken from the content.
fn fill_counts(entry: &mut CurriculumIndexEntry, content: &CurriculumContent) {
    let body = &content.content;
    if entry.exercise_count == 0 {
        entry.exercise_count = body.exercises.len();
    }
    if entry.grammar_count == 0 {
        entry.grammar_count = body.grammar_rules.len();
    }
    if entry.vocabulary_count == 0 {
        entry.vocabulary_count = body.vocabulary.len();
    }
    if entry.title.is_empty() {
        entry.title = content.metadata.title.clone();
    }
    if entry.topic.is_empty() {
        entry.topic = content.metadata.topic.clone();
    }
    if !entry.level.is_rated() {
        entry.level = content.metadata.level;
    }
}

#[async_trait]
impl KnowledgeLoader for JsonBundle {
    fn name(&self) -> &str {
        LOADER_NAME
    }

    async fn load_general(&self) -> Result<Option<KnowledgeBundle>, LoadError> {
        Ok(self.general.clone())
    }

    async fn load_topic(&self, avatar_id: &str) -> Result<Vec<KnowledgeBundle>, LoadError> {
        let bundles: Vec<KnowledgeBundle> = self
            .topic
            .iter()
            .filter(|s| s.visible_to(avatar_id))
            .map(|s| s.item.clone())
            .collect();
        debug!(avatar = avatar_id, bundles = bundles.len(), "Topic bundles selected");
        Ok(bundles)
    }

    async fn load_curriculum_index(
        &self,
        avatar_id: &str,
    ) -> Result<Vec<CurriculumIndexEntry>, LoadError> {
        Ok(self
            .units
            .iter()
            .filter(|s| s.visible_to(avatar_id))
            .map(|s| s.item.clone())
            .collect())
    }
}

#[async_trait]
impl CurriculumFetcher for JsonBundle {
    async fn fetch(&self, unit_id: &str) -> Result<Option<CurriculumContent>, FetchError> {
        Ok(self.contents.get(unit_id).cloned())
    }
}

/// Keyword stand-in for semantic search: a passage scores the share of
/// query terms it contains.
#[async_trait]
impl VectorSearch for JsonBundle {
    fn name(&self) -> &str {
        LOADER_NAME
    }

    async fn search(
        &self,
        query: &str,
        collections: &[String],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, FetchError> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<RetrievedChunk> = self
            .passages
            .iter()
            .filter(|p| collections.is_empty() || collections.contains(&p.source))
            .filter_map(|p| {
                let text = normalize(&p.text);
                let matched = terms.iter().filter(|t| text.contains(t.as_str())).count();
                let score = matched as f32 / terms.len() as f32;
                (matched > 0 && score >= min_score).then(|| RetrievedChunk {
                    score,
                    ..p.clone()
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        debug!(query_terms = terms.len(), results = results.len(), "Bundle passage search");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexiscope_core::CefrLevel;

    const SAMPLE: &str = r#"{
        "general": {
            "grammar": [{ "id": "articles", "name": "Articles", "category": "articles", "keywords": ["article"] }]
        },
        "topic": [
            {
                "source": "kb_food",
                "avatars": ["emma"],
                "vocabulary": [{ "term": "receipt", "termDe": "Quittung", "definition": "proof of payment" }]
            },
            { "topicKeywords": ["travel"] }
        ],
        "units": [
            {
                "id": "u_modals",
                "keywords": ["Modal", "verb"],
                "avatars": ["emma"],
                "content": {
                    "metadata": { "title": "Modal verbs", "level": "B1", "topic": "Obligation" },
                    "content": {
                        "exercises": [{ "id": "ex1", "items": [{ "question": "I ___ go.", "correctAnswer": "must" }] }],
                        "grammarRules": [{ "name": "Must vs have to" }]
                    }
                }
            },
            { "_id": "u_bare", "title": "Bare unit" }
        ],
        "passages": [
            { "collection": "kb_grammar", "text": "Modal verbs like must and can express obligation or ability." },
            { "collection": "kb_grammar", "text": "Articles: use 'a' before consonant sounds." },
            { "collection": "kb_lessons", "text": "Lesson 3 practises modal verbs at the airport.", "metadata": { "source_type": "lesson_slides" } }
        ]
    }"#;

    #[tokio::test]
    async fn topic_sections_respect_avatar_filter() {
        let bundle = JsonBundle::from_json_str("sample", SAMPLE).unwrap();

        let emma = bundle.load_topic("emma").await.unwrap();
        assert_eq!(emma.len(), 2);
        assert_eq!(emma[0].source, "kb_food");
        assert_eq!(emma[0].vocabulary[0].term_target, "Quittung");

        let other = bundle.load_topic("max").await.unwrap();
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].source, "sample#topic1");
        assert_eq!(other[0].topic_keywords, vec!["travel".to_string()]);
    }

    #[tokio::test]
    async fn units_take_counts_and_metadata_from_content() {
        let bundle = JsonBundle::from_json_str("sample", SAMPLE).unwrap();
        let units = bundle.load_curriculum_index("emma").await.unwrap();
        assert_eq!(units.len(), 2);

        let modals = &units[0];
        assert_eq!(modals.title, "Modal verbs");
        assert_eq!(modals.level, CefrLevel::B1);
        assert_eq!(modals.exercise_count, 1);
        assert_eq!(modals.grammar_count, 1);
        assert_eq!(modals.vocabulary_count, 0);

        assert_eq!(bundle.load_curriculum_index("max").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fetch_returns_content_only_for_units_that_have_it() {
        let bundle = JsonBundle::from_json_str("sample", SAMPLE).unwrap();
        let content = bundle.fetch("u_modals").await.unwrap().unwrap();
        assert_eq!(content.content.exercises[0].items[0].correct_answer, "must");
        assert!(bundle.fetch("u_bare").await.unwrap().is_none());
        assert!(bundle.fetch("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn general_bundle_gets_a_source_name() {
        let bundle = JsonBundle::from_json_str("sample", SAMPLE).unwrap();
        let general = bundle.load_general().await.unwrap().unwrap();
        assert_eq!(general.source, "sample#general");
        assert_eq!(general.grammar.len(), 1);

        let empty = JsonBundle::from_json_str("empty", "{}").unwrap();
        assert!(empty.load_general().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn passage_search_ranks_by_term_overlap() {
        let bundle = JsonBundle::from_json_str("sample", SAMPLE).unwrap();
        assert_eq!(bundle.passage_count(), 3);

        let all = bundle.search("What do modal verbs express?", &[], 5, 0.0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].source, "kb_grammar");
        assert!(all[0].text.starts_with("Modal verbs"));
        assert_eq!(all[0].score, 0.75);
        assert_eq!(all[1].source, "kb_lessons");
        assert_eq!(all[1].score, 0.5);

        let lessons = bundle
            .search("modal verbs", &["kb_lessons".to_string()], 5, 0.0)
            .await
            .unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].label(), "lesson_slides");
        assert_eq!(lessons[0].score, 1.0);
    }

    #[tokio::test]
    async fn passage_search_honours_limit_and_min_score() {
        let bundle = JsonBundle::from_json_str("sample", SAMPLE).unwrap();
        let top = bundle.search("modal verbs", &[], 1, 0.0).await.unwrap();
        assert_eq!(top.len(), 1);

        assert!(bundle.search("modal pizza", &[], 5, 0.9).await.unwrap().is_empty());
        assert!(bundle.search("a an", &[], 5, 0.0).await.unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_corrupt() {
        let err = JsonBundle::from_json_str("bad", "{ not json").unwrap_err();
        assert!(matches!(err, LoadError::Corrupt { ref source_name, .. } if source_name == "bad"));
    }

    #[tokio::test]
    async fn open_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let bundle = JsonBundle::open(&path).await.unwrap();
        assert_eq!(bundle.unit_count(), 2);

        let missing = JsonBundle::open(dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(missing, LoadError::Io(_)));
    }
}
