//! Built-in general knowledge.
//!
//! Seeds the general tier when the bulk loader has nothing (or fails), so a
//! session always has the baseline grammar and the most frequent mistakes of
//! German-speaking learners.

use lexiscope_core::{
    CefrLevel, Frequency, GrammarExample, GrammarRule, KnowledgeBundle, MistakeRecord,
};

pub const BUILTIN_SOURCE: &str = "builtin";

pub fn general_bundle() -> KnowledgeBundle {
    KnowledgeBundle {
        source: BUILTIN_SOURCE.into(),
        grammar: grammar_rules(),
        vocabulary: Vec::new(),
        mistakes: mistakes(),
        topic_keywords: Vec::new(),
    }
}

#[allow(clippy::too_many_arguments)]
fn rule(
    id: &str,
    name: &str,
    category: &str,
    level: CefrLevel,
    explanation: &str,
    formula: &str,
    examples: &[(&str, &str)],
    keywords: &[&str],
) -> GrammarRule {
    GrammarRule {
        id: id.into(),
        name: name.into(),
        category: category.into(),
        level,
        explanation: explanation.into(),
        formula: formula.into(),
        examples: examples
            .iter()
            .map(|(correct, incorrect)| GrammarExample::new(*correct, Some(*incorrect)))
            .collect(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn grammar_rules() -> Vec<GrammarRule> {
    vec![
        rule(
            "present_simple",
            "Present Simple Tense",
            "tenses",
            CefrLevel::A1,
            "Use for habits, facts, and regular actions. Third person singular adds -s.",
            "Subject + Verb (+ s for he/she/it)",
            &[
                ("She works every day.", "She work every day."),
                ("He plays tennis.", "He play tennis."),
            ],
            &["present", "simple", "habit", "routine", "-s", "third person"],
        ),
        rule(
            "present_continuous",
            "Present Continuous Tense",
            "tenses",
            CefrLevel::A1,
            "Use for actions happening right now or temporary situations.",
            "Subject + am/is/are + Verb-ing",
            &[
                ("I am working now.", "I work now."),
                ("She is reading a book.", "She reads a book (now)."),
            ],
            &["present", "continuous", "progressive", "now", "currently", "-ing"],
        ),
        rule(
            "articles",
            "Definite and Indefinite Articles",
            "articles",
            CefrLevel::A1,
            "Use 'a/an' for general things, 'the' for specific things. No article for general plurals.",
            "a + consonant sound, an + vowel sound, the = specific",
            &[
                ("I have a dog.", "I have dog."),
                ("The dog is brown.", "Dog is brown."),
                ("I like music.", "I like the music (in general)."),
            ],
            &["article", "a", "an", "the", "definite", "indefinite"],
        ),
        rule(
            "word_order",
            "Word Order in Questions",
            "word_order",
            CefrLevel::A2,
            "In questions, the auxiliary verb comes before the subject. Do/Does/Did for simple tenses.",
            "Question word + Auxiliary + Subject + Main Verb",
            &[
                ("Where do you live?", "Where you live?"),
                ("What does she want?", "What she wants?"),
            ],
            &["question", "word order", "do", "does", "did", "auxiliary"],
        ),
        rule(
            "present_perfect",
            "Present Perfect Tense",
            "tenses",
            CefrLevel::A2,
            "Use for past actions with present relevance, experiences, or unfinished time periods.",
            "Subject + have/has + Past Participle",
            &[
                ("I have visited Paris.", "I visited Paris (for experience)."),
                ("She has worked here for 5 years.", "She works here for 5 years."),
            ],
            &[
                "present perfect",
                "have",
                "has",
                "experience",
                "yet",
                "already",
                "for",
                "since",
            ],
        ),
    ]
}

fn mistakes() -> Vec<MistakeRecord> {
    vec![
        MistakeRecord {
            id: "become_bekommen".into(),
            pattern: r"\bbecom(e|es|ing)\b|\bbecame\b".into(),
            correction: "get/receive".into(),
            explanation: "'Become' means 'werden', not 'bekommen'. Use 'get' or 'receive' for 'bekommen'."
                .into(),
            category: "false_friends".into(),
            frequency: Frequency::VeryCommon,
        },
        MistakeRecord {
            id: "actually_aktuell".into(),
            pattern: r"\bactually\b".into(),
            correction: "currently/at the moment".into(),
            explanation: "'Actually' means 'tatsächlich/eigentlich', not 'aktuell'. Use 'currently' for 'aktuell'."
                .into(),
            category: "false_friends".into(),
            frequency: Frequency::VeryCommon,
        },
        MistakeRecord {
            id: "make_do".into(),
            pattern: r"\bmak(e|es|ing)\s+(my|your|his|her|our|their|the)?\s*homework\b|\b(do|does|did|doing)\s+(a|the)\s+(decision|mistake)\b"
                .into(),
            correction: "make vs do".into(),
            explanation: "'Make' is for creating/producing. 'Do' is for actions/activities. 'Make a decision' but 'do homework'."
                .into(),
            category: "collocations".into(),
            frequency: Frequency::Common,
        },
        MistakeRecord {
            id: "since_for".into(),
            pattern: r"\bsince\s+(\d+|a|an|one|two|three|four|five|six|seven|eight|nine|ten)\s+(minutes?|hours?|days?|weeks?|months?|years?)\b"
                .into(),
            correction: "since vs for".into(),
            explanation: "'Since' + point in time (since Monday). 'For' + duration (for 3 days)."
                .into(),
            category: "prepositions".into(),
            frequency: Frequency::Common,
        },
    ]
}
