//! End-to-end integration tests for the Lexiscope knowledge engine.
//!
//! These tests exercise the full pipeline from utterance to composed
//! context, including bundle loading, tier suppression, curriculum fetches,
//! the response cache and memoized vector search.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lexiscope_config::AppConfig;
use lexiscope_core::{FetchError, RetrievedChunk, VectorSearch, format_chunks};
use lexiscope_knowledge::{ComposeOptions, ExerciseTracker, JsonBundle, KnowledgeEngine};

// ── Mock Vector Search ───────────────────────────────────────────────────

/// A search backend that counts calls and can be made slow or failing.
struct MockSearch {
    calls: AtomicUsize,
    delay: Duration,
    fail: bool,
}

impl MockSearch {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VectorSearch for MockSearch {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn search(
        &self,
        query: &str,
        collections: &[String],
        limit: usize,
        _min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(FetchError::Unavailable("index offline".into()));
        }
        let source = collections.first().cloned().unwrap_or_else(|| "default".into());
        Ok((0..limit)
            .map(|i| RetrievedChunk::new(format!("{query} #{i}"), 0.9, source.clone()))
            .collect())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

const BUNDLE: &str = r#"{
    "topic": [
        {
            "source": "kb_restaurant",
            "avatars": ["emma"],
            "grammar": [{
                "id": "countable_food",
                "name": "Countable and uncountable food",
                "category": "articles",
                "level": "A2",
                "explanation": "Uncountable food nouns take no indefinite article.",
                "examples": [{ "correct": "I'd like some bread.", "incorrect": "I'd like a bread." }],
                "keywords": ["article", "uncountable"]
            }],
            "vocabulary": [
                { "term": "receipt", "termDe": "Quittung", "definition": "proof of payment", "partOfSpeech": "noun" },
                { "term": "waiter", "termDe": "Kellner", "definition": "person serving at tables", "partOfSpeech": "noun" }
            ],
            "topicKeywords": ["restaurant", "menu"]
        }
    ],
    "units": [
        {
            "id": "u_modals",
            "keywords": ["modal", "verb"],
            "content": {
                "metadata": { "title": "Modal verbs", "level": "B1", "topic": "Obligation" },
                "content": {
                    "exercises": [{
                        "id": "ex_modals",
                        "title": "Must or should",
                        "items": [
                            { "id": "i1", "question": "You ___ stop at a red light.", "correctAnswer": "must" },
                            { "id": "i2", "question": "You ___ try the soup.", "correctAnswer": "should", "hint": "advice" }
                        ]
                    }],
                    "grammarRules": [{ "name": "Must vs should", "rule": "Must is obligation, should is advice." }]
                },
                "cachedResponses": [
                    { "trigger": "hello", "response": "Hi! Shall we practise modal verbs?", "isPattern": true, "priority": 10 },
                    { "trigger": "thank you", "response": "You're welcome!", "priority": 1 }
                ],
                "slides": [{ "id": "slide_1", "explanation": "Must expresses a strong obligation." }]
            }
        },
        { "id": "u_food", "title": "At the restaurant", "keywords": ["lunch", "menu"], "vocabularyCount": 12 }
    ],
    "passages": [
        { "collection": "kb_grammar", "text": "Modal verbs such as must and should express obligation or advice." },
        { "collection": "kb_food", "text": "Waiters bring the menu before you order." },
        { "collection": "kb_lessons", "text": "Practise modal verbs in the airport lesson." }
    ]
}"#;

async fn bundle_engine(config: AppConfig, avatar: &str) -> KnowledgeEngine {
    let bundle = Arc::new(JsonBundle::from_json_str("e2e", BUNDLE).unwrap());
    KnowledgeEngine::builder(config)
        .with_loader(bundle.clone())
        .with_fetcher(bundle)
        .initialize(avatar)
        .await
}

async fn search_engine(search: Arc<MockSearch>, config: AppConfig) -> KnowledgeEngine {
    KnowledgeEngine::builder(config)
        .with_search(search)
        .initialize("emma")
        .await
}

// ── E2E: Tiered Context ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_topic_tier_suppresses_general_grammar() {
    let engine = bundle_engine(AppConfig::default(), "emma").await;

    let ctx = engine
        .get_context_for_query("Do I need an article with uncountable bread?", &ComposeOptions::default())
        .await;

    assert!(ctx.starts_with("[TOPIC GRAMMAR KNOWLEDGE]"));
    assert!(ctx.contains("Countable and uncountable food"));
    assert!(!ctx.contains("[RELEVANT GRAMMAR RULES]"));
}

#[tokio::test]
async fn e2e_other_avatar_gets_general_tier_only() {
    let engine = bundle_engine(AppConfig::default(), "max").await;
    assert!(engine.topic().is_empty());

    let ctx = engine
        .get_context_for_query("Do I need an article here?", &ComposeOptions::default())
        .await;
    assert!(ctx.contains("[RELEVANT GRAMMAR RULES]"));
    assert!(ctx.contains("Definite and Indefinite Articles"));
}

#[tokio::test]
async fn e2e_become_gets_correction_and_no_vocabulary() {
    let engine = bundle_engine(AppConfig::default(), "emma").await;

    let ctx = engine
        .compose("I will become the documents tomorrow", &ComposeOptions::default())
        .await;
    assert!(ctx.general_mistake.as_deref().unwrap().contains("get/receive"));
    assert!(ctx.topic_vocabulary.is_none());
    assert!(ctx.general_vocabulary.is_none());
}

#[tokio::test]
async fn e2e_topic_vocabulary_is_found_in_both_languages() {
    let engine = bundle_engine(AppConfig::default(), "emma").await;

    let ctx = engine
        .get_context_for_query("Can the Kellner bring the receipt?", &ComposeOptions::default())
        .await;
    assert!(ctx.contains("[TOPIC VOCABULARY]"));
    assert!(ctx.contains("receipt"));
    assert!(ctx.contains("waiter"));
}

#[tokio::test]
async fn e2e_curriculum_matches_modal_question_only() {
    let engine = bundle_engine(AppConfig::default(), "emma").await;
    let options = ComposeOptions::default();

    let modal = engine.get_context_for_query("explain the modal verb rule", &options).await;
    assert!(modal.contains("[LESSON: Modal verbs]"));

    let lunch = engine.compose("what's for lunch", &options).await;
    // the food unit matches but has no content to render
    assert!(lunch.curriculum.is_none());

    let disabled = ComposeOptions {
        curriculum: false,
        ..ComposeOptions::default()
    };
    let without = engine.get_context_for_query("explain the modal verb rule", &disabled).await;
    assert!(!without.contains("[LESSON"));
}

#[tokio::test]
async fn e2e_context_respects_configured_cap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[composer]\nmax_context_chars = 60\n").unwrap();
    let config = AppConfig::load_from(&path).unwrap();

    let engine = bundle_engine(config, "emma").await;
    let ctx = engine
        .get_context_for_query("explain the modal verb rule, I actually become confused", &ComposeOptions::default())
        .await;
    assert!(!ctx.is_empty());
    assert!(ctx.chars().count() <= 60);
}

#[tokio::test]
async fn e2e_empty_utterance_yields_empty_context() {
    let engine = bundle_engine(AppConfig::default(), "emma").await;
    let ctx = engine.get_context_for_query("   ", &ComposeOptions::default()).await;
    assert!(ctx.is_empty());
}

// ── E2E: Response Cache ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_unit_responses_answer_without_llm() {
    let engine = bundle_engine(AppConfig::default(), "emma").await;
    assert!(engine.lookup_response("Hello there!", None).await.is_none());

    engine.load_unit_responses("u_modals").await;

    let hello = engine.lookup_response("Hello there!", None).await.unwrap();
    assert_eq!(hello.response, "Hi! Shall we practise modal verbs?");
    assert_eq!(hello.priority, 10);

    let thanks = engine.lookup_response("thank you!", None).await.unwrap();
    assert_eq!(thanks.response, "You're welcome!");

    let slide = engine.lookup_response("Explain this", Some("slide_1")).await.unwrap();
    assert_eq!(slide.response, "Must expresses a strong obligation.");
    assert!(engine.lookup_response("explain this", None).await.is_none());

    let stats = engine.stats().await;
    assert_eq!(stats.responses.hits(), 3);
    assert_eq!(stats.responses.misses, 2);
}

// ── E2E: Exercise Grading ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_exercise_from_fetched_unit() {
    let engine = bundle_engine(AppConfig::default(), "emma").await;
    let content = engine.curriculum().get_content("u_modals").await.unwrap();
    let exercise = content.content.exercises[0].clone();

    let mut tracker = ExerciseTracker::start(exercise);
    assert!(tracker.check_answer("must").unwrap().has_next);

    let wrong = tracker.check_answer("could").unwrap();
    assert!(!wrong.grade.correct);
    assert_eq!(wrong.hint.as_deref(), Some("advice"));

    let done = tracker.check_answer("shold").unwrap();
    assert!(done.grade.correct && !done.grade.exact);
    assert_eq!(done.score, Some(100));
}

// ── E2E: Memoized Vector Search ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn e2e_search_is_cached_until_ttl() {
    let search = Arc::new(MockSearch::new());
    let engine = search_engine(search.clone(), AppConfig::default()).await;
    let collections = vec!["grammar_docs".to_string()];

    let first = engine.retrieve("present perfect", &collections).await;
    let second = engine.retrieve("  Present   Perfect ", &collections).await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(search.calls(), 1);

    // different collection set, different key
    engine.retrieve("present perfect", &[]).await;
    assert_eq!(search.calls(), 2);

    tokio::time::advance(Duration::from_secs(301)).await;
    engine.retrieve("present perfect", &collections).await;
    assert_eq!(search.calls(), 3);

    let stats = engine.stats().await.search_cache.unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.expirations, 1);
}

#[tokio::test]
async fn e2e_search_errors_are_not_cached() {
    let search = Arc::new(MockSearch::failing());
    let engine = search_engine(search.clone(), AppConfig::default()).await;

    assert!(engine.retrieve("articles", &[]).await.is_empty());
    assert!(engine.retrieve("articles", &[]).await.is_empty());
    assert_eq!(search.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn e2e_slow_search_times_out_to_empty() {
    let search = Arc::new(MockSearch::slow(Duration::from_secs(2)));
    let engine = search_engine(search.clone(), AppConfig::default()).await;

    assert!(engine.retrieve("articles", &[]).await.is_empty());
    assert_eq!(search.calls(), 1);
    assert_eq!(engine.stats().await.search_cache.unwrap().size, 0);
}

#[tokio::test]
async fn e2e_search_cache_evicts_least_recently_used() {
    let mut config = AppConfig::default();
    config.cache.search.capacity = 2;
    let search = Arc::new(MockSearch::new());
    let engine = search_engine(search.clone(), config).await;

    engine.retrieve("a", &[]).await;
    engine.retrieve("b", &[]).await;
    engine.retrieve("a", &[]).await; // promotes "a"
    engine.retrieve("c", &[]).await; // evicts "b"
    assert_eq!(search.calls(), 3);

    engine.retrieve("a", &[]).await;
    assert_eq!(search.calls(), 3);
    engine.retrieve("b", &[]).await;
    assert_eq!(search.calls(), 4);
}

// ── E2E: Quick Answers & Stats ───────────────────────────────────────────

#[tokio::test]
async fn e2e_quick_answers() {
    let engine = bundle_engine(AppConfig::default(), "emma").await;

    let correction = engine.quick_answer("I actually work in Munich").unwrap();
    assert!(correction.contains("currently/at the moment"));

    let card = engine.quick_answer("Quittung").unwrap();
    assert!(card.contains("proof of payment"));

    assert!(engine.quick_answer("I would like to order the soup").is_none());
}

#[tokio::test]
async fn e2e_stats_serialize_to_json() {
    let engine = bundle_engine(AppConfig::default(), "emma").await;
    let stats = engine.stats().await;

    let json: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
    assert_eq!(json["avatar_id"], "emma");
    assert_eq!(json["curriculum_units"], 2);
    assert_eq!(json["topic"]["vocabulary_entries"], 2);
    assert_eq!(json["general"]["grammar_rules"], 5);
    assert!(json["search_cache"].is_null());

    assert!(engine.curriculum_summary().contains("Modal verbs (B1): Obligation"));
}

// ── E2E: Bundle Passage Search ───────────────────────────────────────────

#[tokio::test]
async fn e2e_bundle_passages_serve_memoized_retrieval() {
    let bundle = Arc::new(JsonBundle::from_json_str("e2e", BUNDLE).unwrap());
    let engine = KnowledgeEngine::builder(AppConfig::default())
        .with_loader(bundle.clone())
        .with_search(bundle)
        .initialize("emma")
        .await;

    let chunks = engine.retrieve("modal verbs obligation", &[]).await;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].score, 1.0);
    let rendered = format_chunks(&chunks);
    assert!(rendered.starts_with("[Source 1 - kb_grammar]:\nModal verbs"));

    let again = engine.retrieve("Modal  verbs OBLIGATION", &[]).await;
    assert_eq!(again, chunks);

    let food_only = engine
        .retrieve("modal verbs obligation", &["kb_food".to_string()])
        .await;
    assert!(food_only.is_empty());

    let stats = engine.stats().await.search_cache.unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
}
