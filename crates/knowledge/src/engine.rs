//! Session-scoped knowledge engine.
//!
//! Owns every index and cache for one tutoring session and exposes the
//! per-utterance query API. Construct one per session through
//! [`KnowledgeEngine::builder`]; initialization never fails, a missing or
//! broken collaborator only means less context.

use chrono::{DateTime, Utc};
use lexiscope_cache::{CacheStats, CachedSearch, ResponseCache, ResponseCacheStats, ResponseHit};
use lexiscope_config::AppConfig;
use lexiscope_core::{
    CurriculumFetcher, FetchError, Frequency, KnowledgeLoader, ResponseRecord, RetrievedChunk,
    Similarity, VectorSearch,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::builtin;
use crate::composer::{ComposeOptions, KnowledgeContext, TieredComposer};
use crate::curriculum::{CurriculumIndex, Focus, format_content};
use crate::index::{IndexStats, KnowledgeIndex, Tier, trim_word};
use crate::progress::SessionProgress;
use crate::render;

/// Longest utterance (in words) answered with a vocabulary card.
const QUICK_ANSWER_MAX_WORDS: usize = 3;

/// Collects collaborators before the one-shot load.
pub struct EngineBuilder {
    config: AppConfig,
    loader: Option<Arc<dyn KnowledgeLoader>>,
    fetcher: Option<Arc<dyn CurriculumFetcher>>,
    search: Option<Arc<dyn VectorSearch>>,
}

impl EngineBuilder {
    /// Attach the bulk loader that seeds both tiers and the curriculum index.
    pub fn with_loader(mut self, loader: Arc<dyn KnowledgeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Attach the store that serves full curriculum content on demand.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn CurriculumFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Attach a vector search backend; results are memoized.
    pub fn with_search(mut self, search: Arc<dyn VectorSearch>) -> Self {
        self.search = Some(search);
        self
    }

    /// Load everything for `avatar_id` and build the engine.
    pub async fn initialize(self, avatar_id: impl Into<String>) -> KnowledgeEngine {
        let avatar_id = avatar_id.into();
        let config = self.config;
        let name_similarity = Similarity::new(config.matching.grammar_name_threshold);

        let (general, topic, units) = match &self.loader {
            Some(loader) => {
                let general = match loader.load_general().await {
                    Ok(Some(bundle)) if !bundle.is_empty() => bundle,
                    Ok(_) => {
                        info!(loader = loader.name(), "No general knowledge, using built-in defaults");
                        builtin::general_bundle()
                    }
                    Err(e) => {
                        warn!(loader = loader.name(), error = %e, "General knowledge load failed, using built-in defaults");
                        builtin::general_bundle()
                    }
                };
                let topic = loader.load_topic(&avatar_id).await.unwrap_or_else(|e| {
                    warn!(loader = loader.name(), avatar = %avatar_id, error = %e, "Topic knowledge load failed");
                    Vec::new()
                });
                let units = loader
                    .load_curriculum_index(&avatar_id)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(loader = loader.name(), avatar = %avatar_id, error = %e, "Curriculum index load failed");
                        Vec::new()
                    });
                (general, topic, units)
            }
            None => (builtin::general_bundle(), Vec::new(), Vec::new()),
        };

        let general = KnowledgeIndex::build(Tier::General, [general], name_similarity);
        let topic = if topic.is_empty() {
            KnowledgeIndex::empty(Tier::Topic)
        } else {
            KnowledgeIndex::build(Tier::Topic, topic, name_similarity)
        };
        let curriculum_policy = config.cache.curriculum;
        let curriculum = CurriculumIndex::new(
            units,
            self.fetcher,
            curriculum_policy.capacity,
            curriculum_policy.ttl(),
        );
        let search_policy = config.cache.search;
        let search = self
            .search
            .map(|backend| CachedSearch::new(backend, search_policy.capacity, search_policy.ttl()));
        let responses = ResponseCache::new(Similarity::new(config.matching.response_threshold));

        let engine = KnowledgeEngine {
            session_id: Uuid::new_v4(),
            avatar_id,
            started_at: Utc::now(),
            config,
            topic,
            general,
            curriculum,
            responses: RwLock::new(responses),
            search,
            progress: RwLock::new(None),
        };
        info!(
            session = %engine.session_id,
            avatar = %engine.avatar_id,
            topic_loaded = !engine.topic.is_empty(),
            units = engine.curriculum.len(),
            search = engine.search.is_some(),
            "Knowledge engine initialized"
        );
        engine
    }
}

/// Loaded-state summary for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub session_id: Uuid,
    pub avatar_id: String,
    pub started_at: DateTime<Utc>,
    pub topic: IndexStats,
    pub general: IndexStats,
    pub curriculum_units: usize,
    pub curriculum_cache: CacheStats,
    pub search_cache: Option<CacheStats>,
    pub responses: ResponseCacheStats,
}

impl EngineStats {
    pub fn to_json(&self) -> lexiscope_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct KnowledgeEngine {
    session_id: Uuid,
    avatar_id: String,
    started_at: DateTime<Utc>,
    config: AppConfig,
    topic: KnowledgeIndex,
    general: KnowledgeIndex,
    curriculum: CurriculumIndex,
    responses: RwLock<ResponseCache>,
    search: Option<CachedSearch>,
    progress: RwLock<Option<SessionProgress>>,
}

impl KnowledgeEngine {
    pub fn builder(config: AppConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            loader: None,
            fetcher: None,
            search: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn avatar_id(&self) -> &str {
        &self.avatar_id
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn topic(&self) -> &KnowledgeIndex {
        &self.topic
    }

    pub fn general(&self) -> &KnowledgeIndex {
        &self.general
    }

    pub fn curriculum(&self) -> &CurriculumIndex {
        &self.curriculum
    }

    // ── Context ───────────────────────────────────────────────────────────

    /// Knowledge context for one utterance, bounded by `max_context_chars`.
    /// Empty when nothing relevant is known.
    pub async fn get_context_for_query(&self, text: &str, options: &ComposeOptions) -> String {
        let ctx = self.compose(text, options).await;
        let rendered = ctx.render(self.config.composer.max_context_chars);
        debug!(
            chars = rendered.chars().count(),
            topic = ctx.has_topic_context(),
            general = ctx.has_general_context(),
            curriculum = ctx.curriculum.is_some(),
            "Context composed"
        );
        rendered
    }

    /// Per-category contributions before rendering.
    pub async fn compose(&self, text: &str, options: &ComposeOptions) -> KnowledgeContext {
        let composer = TieredComposer::new(
            &self.topic,
            &self.general,
            self.config.composer.min_vocab_word_len,
        );
        let mut ctx = composer.compose(text, options);

        if options.curriculum {
            ctx.curriculum = self.curriculum_context(text).await;
        }
        ctx.progress = self.progress.read().await.as_ref().map(SessionProgress::render);

        if ctx.has_topic_context() {
            info!("Context sourced from topic knowledge");
        } else if ctx.has_general_context() {
            info!("Context sourced from general knowledge");
        }
        ctx
    }

    /// Lesson block for the best matching unit. A fetch that outlives the
    /// curriculum timeout counts as a miss.
    async fn curriculum_context(&self, text: &str) -> Option<String> {
        let unit = self.curriculum.match_query(text).into_iter().next()?;
        let timeout = self.config.composer.curriculum_timeout();

        let content = match tokio::time::timeout(timeout, self.curriculum.get_content(&unit.id)).await {
            Ok(content) => content?,
            Err(_) => {
                let err = FetchError::Timeout {
                    what: format!("curriculum fetch for {}", unit.id),
                    timeout_ms: self.config.composer.curriculum_timeout_ms,
                };
                warn!(unit = %unit.id, error = %err, "Curriculum content treated as a miss");
                return None;
            }
        };

        debug!(unit = %unit.id, title = %unit.title, "Curriculum unit matched");
        let block = format_content(
            &content,
            Focus::detect(text),
            self.config.composer.curriculum_max_chars,
        );
        (!block.is_empty()).then_some(block)
    }

    // ── Responses ─────────────────────────────────────────────────────────

    /// Pre-written response for an utterance, if one is registered.
    pub async fn lookup_response(&self, text: &str, scope_tag: Option<&str>) -> Option<ResponseHit> {
        self.responses.read().await.lookup(text, scope_tag)
    }

    pub async fn load_lesson_responses(&self, records: &[ResponseRecord]) -> usize {
        self.responses.write().await.load_lesson_responses(records)
    }

    /// Register a unit's cached responses and slide explanations.
    /// Returns how many entries were added.
    pub async fn load_unit_responses(&self, unit_id: &str) -> usize {
        let Some(content) = self.curriculum.get_content(unit_id).await else {
            debug!(unit = unit_id, "No content to load responses from");
            return 0;
        };
        let mut responses = self.responses.write().await;
        responses.load_lesson_responses(&content.cached_responses)
            + responses.load_slide_explanations(&content.slides)
    }

    pub async fn clear_responses(&self) {
        self.responses.write().await.clear();
    }

    // ── Retrieval ─────────────────────────────────────────────────────────

    /// Memoized vector search. Errors, timeouts and a missing backend all
    /// yield no chunks.
    pub async fn retrieve(&self, text: &str, collections: &[String]) -> Vec<RetrievedChunk> {
        let Some(search) = &self.search else {
            return Vec::new();
        };
        let cfg = &self.config.composer;

        let call = search.search_cached(text, collections, cfg.search_limit, cfg.search_min_score);
        match tokio::time::timeout(cfg.search_timeout(), call).await {
            Ok(Ok((chunks, was_cached))) => {
                debug!(results = chunks.len(), was_cached, "Retrieved chunks");
                chunks
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Vector search failed");
                Vec::new()
            }
            Err(_) => {
                let err = FetchError::Timeout {
                    what: "vector search".into(),
                    timeout_ms: cfg.search_timeout_ms,
                };
                warn!(error = %err, "Vector search failed");
                Vec::new()
            }
        }
    }

    // ── Quick answers ─────────────────────────────────────────────────────

    /// An answer that needs no LLM: the correction for a very common
    /// mistake, or a definition card when the utterance is a short term.
    pub fn quick_answer(&self, text: &str) -> Option<String> {
        if let Some(mistake) = self.general.check_mistakes(text).first()
            && mistake.frequency == Frequency::VeryCommon
        {
            return Some(render::correction_sentence(mistake));
        }

        if text.split_whitespace().count() > QUICK_ANSWER_MAX_WORDS {
            return None;
        }
        let term = trim_word(text.trim());
        if term.is_empty() {
            return None;
        }
        self.topic
            .lookup_vocabulary(term)
            .or_else(|| self.general.lookup_vocabulary(term))
            .map(render::definition_card)
    }

    // ── Session state ─────────────────────────────────────────────────────

    pub async fn set_progress(&self, progress: Option<SessionProgress>) {
        *self.progress.write().await = progress;
    }

    /// Lesson overview for a system prompt.
    pub fn curriculum_summary(&self) -> String {
        self.curriculum.summary()
    }

    pub async fn stats(&self) -> EngineStats {
        let search_cache = match &self.search {
            Some(search) => Some(search.stats().await),
            None => None,
        };
        EngineStats {
            session_id: self.session_id,
            avatar_id: self.avatar_id.clone(),
            started_at: self.started_at,
            topic: self.topic.stats(),
            general: self.general.stats(),
            curriculum_units: self.curriculum.len(),
            curriculum_cache: self.curriculum.cache_stats().await,
            search_cache,
            responses: self.responses.read().await.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lexiscope_core::curriculum::{Exercise, ExerciseItem, UnitBody, UnitMetadata};
    use lexiscope_core::{
        CefrLevel, CurriculumContent, CurriculumIndexEntry, FetchError, GrammarRule,
        KnowledgeBundle, LoadError, Slide, VocabularyEntry,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubLoader {
        general: Result<Option<KnowledgeBundle>, LoadError>,
        topic: Vec<KnowledgeBundle>,
        units: Vec<CurriculumIndexEntry>,
    }

    #[async_trait]
    impl KnowledgeLoader for StubLoader {
        fn name(&self) -> &str {
            "stub"
        }

        async fn load_general(&self) -> Result<Option<KnowledgeBundle>, LoadError> {
            self.general.clone()
        }

        async fn load_topic(&self, _avatar_id: &str) -> Result<Vec<KnowledgeBundle>, LoadError> {
            Ok(self.topic.clone())
        }

        async fn load_curriculum_index(
            &self,
            _avatar_id: &str,
        ) -> Result<Vec<CurriculumIndexEntry>, LoadError> {
            Ok(self.units.clone())
        }
    }

    struct SlowFetcher {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CurriculumFetcher for SlowFetcher {
        async fn fetch(&self, _unit_id: &str) -> Result<Option<CurriculumContent>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Some(modal_content()))
        }
    }

    fn modal_unit() -> CurriculumIndexEntry {
        CurriculumIndexEntry {
            id: "u_modals".into(),
            title: "Modal verbs".into(),
            topic: "Obligation".into(),
            level: CefrLevel::B1,
            exercise_count: 1,
            vocabulary_count: 0,
            grammar_count: 0,
            keywords: vec!["modal".into(), "verb".into()],
        }
    }

    fn modal_content() -> CurriculumContent {
        CurriculumContent {
            metadata: UnitMetadata {
                title: "Modal verbs".into(),
                level: CefrLevel::B1,
                topic: "Obligation".into(),
            },
            content: UnitBody {
                exercises: vec![Exercise {
                    id: "ex1".into(),
                    title: "Must or have to".into(),
                    items: vec![ExerciseItem {
                        question: "You ___ wear a seatbelt.".into(),
                        correct_answer: "must".into(),
                        ..ExerciseItem::default()
                    }],
                    ..Exercise::default()
                }],
                ..UnitBody::default()
            },
            cached_responses: vec![ResponseRecord {
                trigger: "hello".into(),
                response: "Hi! Ready for modal verbs?".into(),
                is_pattern: true,
                priority: 10,
                ..ResponseRecord::default()
            }],
            slides: vec![Slide {
                id: Some("s1".into()),
                explanation: "Must expresses obligation.".into(),
                ..Slide::default()
            }],
        }
    }

    fn vocab(term: &str, target: &str) -> VocabularyEntry {
        VocabularyEntry {
            term: term.into(),
            term_target: target.into(),
            definition: format!("meaning of {term}"),
            part_of_speech: "noun".into(),
            level: CefrLevel::A2,
            example: String::new(),
            category: String::new(),
            synonyms: vec![],
        }
    }

    async fn engine_with(loader: StubLoader, fetcher: Arc<SlowFetcher>) -> KnowledgeEngine {
        KnowledgeEngine::builder(AppConfig::default())
            .with_loader(Arc::new(loader))
            .with_fetcher(fetcher)
            .initialize("emma")
            .await
    }

    fn fetcher(delay: Duration) -> Arc<SlowFetcher> {
        Arc::new(SlowFetcher {
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn loader_failure_falls_back_to_builtin_general() {
        let engine = engine_with(
            StubLoader {
                general: Err(LoadError::Unavailable("offline".into())),
                topic: vec![],
                units: vec![],
            },
            fetcher(Duration::ZERO),
        )
        .await;

        assert_eq!(engine.general().sources(), &[builtin::BUILTIN_SOURCE.to_string()]);
        assert!(engine.topic().is_empty());
        let ctx = engine
            .get_context_for_query("I will become the documents tomorrow", &ComposeOptions::default())
            .await;
        assert!(ctx.contains("get/receive"));
    }

    #[tokio::test]
    async fn engine_without_collaborators_still_answers() {
        let engine = KnowledgeEngine::builder(AppConfig::default()).initialize("emma").await;
        assert!(engine.retrieve("anything", &[]).await.is_empty());
        assert!(engine.lookup_response("hello", None).await.is_none());
        assert_eq!(engine.curriculum_summary(), "No lesson materials loaded.");
        let ctx = engine.get_context_for_query("", &ComposeOptions::default()).await;
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn curriculum_is_added_and_cached() {
        let slow = fetcher(Duration::ZERO);
        let engine = engine_with(
            StubLoader {
                general: Ok(None),
                topic: vec![],
                units: vec![modal_unit()],
            },
            slow.clone(),
        )
        .await;

        let options = ComposeOptions::default();
        let first = engine.get_context_for_query("explain the modal verb rule", &options).await;
        assert!(first.contains("[LESSON: Modal verbs]"));
        let second = engine.get_context_for_query("explain the modal verb rule", &options).await;
        assert_eq!(first, second);
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);

        let lunch = engine.get_context_for_query("what's for lunch", &options).await;
        assert!(!lunch.contains("[LESSON"));

        let stats = engine.stats().await;
        assert_eq!(stats.curriculum_cache.hits, 1);
        assert_eq!(stats.curriculum_units, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_curriculum_fetch_is_a_miss() {
        let engine = engine_with(
            StubLoader {
                general: Ok(None),
                topic: vec![],
                units: vec![modal_unit()],
            },
            fetcher(Duration::from_secs(5)),
        )
        .await;

        let ctx = engine
            .get_context_for_query("explain the modal verb rule", &ComposeOptions::default())
            .await;
        assert!(!ctx.contains("[LESSON"));
    }

    #[tokio::test]
    async fn unit_responses_serve_triggers_and_slides() {
        let engine = engine_with(
            StubLoader {
                general: Ok(None),
                topic: vec![],
                units: vec![modal_unit()],
            },
            fetcher(Duration::ZERO),
        )
        .await;

        let added = engine.load_unit_responses("u_modals").await;
        assert!(added > 1);

        let hit = engine.lookup_response("Hello there!", None).await.unwrap();
        assert_eq!(hit.response, "Hi! Ready for modal verbs?");
        assert_eq!(hit.priority, 10);

        let slide = engine.lookup_response("explain this", Some("s1")).await.unwrap();
        assert_eq!(slide.response, "Must expresses obligation.");
        assert!(engine.lookup_response("explain this", Some("s2")).await.is_none());

        engine.clear_responses().await;
        assert!(engine.lookup_response("hello", None).await.is_none());
    }

    #[tokio::test]
    async fn quick_answer_prefers_very_common_mistakes() {
        let engine = engine_with(
            StubLoader {
                general: Ok(None),
                topic: vec![KnowledgeBundle {
                    vocabulary: vec![vocab("receipt", "Quittung")],
                    ..KnowledgeBundle::default()
                }],
                units: vec![],
            },
            fetcher(Duration::ZERO),
        )
        .await;

        let correction = engine.quick_answer("I actually live in Berlin").unwrap();
        assert!(correction.starts_with("I noticed a common mistake!"));

        let card = engine.quick_answer("Quittung?").unwrap();
        assert!(card.starts_with("**receipt** (Quittung)"));

        assert!(engine.quick_answer("where can I get a receipt").is_none());
        assert!(engine.quick_answer("   ").is_none());
    }

    #[tokio::test]
    async fn topic_grammar_suppresses_general_grammar() {
        let engine = engine_with(
            StubLoader {
                general: Ok(None),
                topic: vec![KnowledgeBundle {
                    grammar: vec![GrammarRule {
                        id: "articles_topic".into(),
                        name: "Articles with food".into(),
                        category: "articles".into(),
                        level: CefrLevel::A2,
                        explanation: "Uncountable food takes no article.".into(),
                        formula: String::new(),
                        examples: vec![],
                        keywords: vec!["article".into()],
                    }],
                    ..KnowledgeBundle::default()
                }],
                units: vec![],
            },
            fetcher(Duration::ZERO),
        )
        .await;

        let ctx = engine
            .get_context_for_query("which article do I use?", &ComposeOptions::default())
            .await;
        assert!(ctx.contains("[TOPIC GRAMMAR KNOWLEDGE]"));
        assert!(!ctx.contains("[RELEVANT GRAMMAR RULES]"));
    }

    #[tokio::test]
    async fn progress_note_is_appended_last() {
        let engine = KnowledgeEngine::builder(AppConfig::default()).initialize("emma").await;
        engine
            .set_progress(Some(SessionProgress::from_results(&[Some(100)])))
            .await;
        let ctx = engine
            .get_context_for_query("I actually like it", &ComposeOptions::default())
            .await;
        assert!(ctx.ends_with("Average score: 100%"));
    }

    #[test]
    fn engine_can_be_shared_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KnowledgeEngine>();
    }
}
