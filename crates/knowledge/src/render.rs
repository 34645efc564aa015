//! Prompt-ready rendering of knowledge hits.
//!
//! Each tier renders under its own headers so the LLM can tell topic
//! knowledge from the built-in baseline.

use lexiscope_core::{GrammarRule, VocabularyEntry};

use crate::index::{MistakePattern, Tier};

/// Rules rendered per grammar block.
pub const MAX_RENDERED_RULES: usize = 3;
/// Examples rendered per rule.
pub const MAX_RENDERED_EXAMPLES: usize = 2;
/// Entries rendered per vocabulary block.
pub const MAX_RENDERED_VOCABULARY: usize = 5;

pub fn grammar(tier: Tier, rules: &[&GrammarRule]) -> Option<String> {
    if rules.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    match tier {
        Tier::Topic => {
            parts.push("[TOPIC GRAMMAR KNOWLEDGE]".to_string());
            for rule in rules.iter().take(MAX_RENDERED_RULES) {
                parts.push(format!("\n**{}** ({})", rule.name, rule.level));
                parts.push(rule.explanation.clone());
                if !rule.examples.is_empty() {
                    let examples: Vec<&str> = rule
                        .examples
                        .iter()
                        .take(MAX_RENDERED_EXAMPLES)
                        .map(|e| e.correct.as_str())
                        .collect();
                    parts.push(format!("Examples: {}", examples.join("; ")));
                }
            }
        }
        Tier::General => {
            parts.push("[RELEVANT GRAMMAR RULES]".to_string());
            for rule in rules.iter().take(MAX_RENDERED_RULES) {
                parts.push(format!("\n## {}", rule.name));
                parts.push(format!("Level: {}", rule.level));
                parts.push(format!("Explanation: {}", rule.explanation));
                if !rule.formula.is_empty() {
                    parts.push(format!("Formula: {}", rule.formula));
                }
                if !rule.examples.is_empty() {
                    parts.push("Examples:".to_string());
                    for example in rule.examples.iter().take(MAX_RENDERED_EXAMPLES) {
                        parts.push(format!("  ✓ {}", example.correct));
                        if let Some(incorrect) = &example.incorrect {
                            parts.push(format!("  ✗ {incorrect}"));
                        }
                    }
                }
            }
        }
    }
    Some(parts.join("\n"))
}

pub fn vocabulary(tier: Tier, entries: &[&VocabularyEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    match tier {
        Tier::Topic => {
            parts.push("[TOPIC VOCABULARY]".to_string());
            for entry in entries.iter().take(MAX_RENDERED_VOCABULARY) {
                parts.push(format!(
                    "- **{}** ({}) - {}: {}",
                    entry.term, entry.term_target, entry.part_of_speech, entry.definition
                ));
                if !entry.example.is_empty() {
                    parts.push(format!("  *Example: {}*", entry.example));
                }
            }
        }
        Tier::General => {
            parts.push("[VOCABULARY REFERENCE]".to_string());
            for entry in entries.iter().take(MAX_RENDERED_VOCABULARY) {
                parts.push(format!(
                    "• {} ({}) - {}",
                    entry.term, entry.term_target, entry.definition
                ));
                if !entry.example.is_empty() {
                    parts.push(format!("  Example: {}", entry.example));
                }
            }
        }
    }
    Some(parts.join("\n"))
}

/// Render the first detected mistake. The general tier phrases it as a
/// correction the avatar can say directly.
pub fn mistake(tier: Tier, mistakes: &[&MistakePattern]) -> Option<String> {
    let mistake = mistakes.first()?;
    Some(match tier {
        Tier::Topic => format!(
            "[TOPIC MISTAKE DETECTED - {}]\nStudent may have made this error: {}\nCorrection: {}\nExplanation: {}",
            mistake.category,
            mistake.pattern(),
            mistake.correction,
            mistake.explanation
        ),
        Tier::General => correction_sentence(mistake),
    })
}

pub fn correction_sentence(mistake: &MistakePattern) -> String {
    format!(
        "I noticed a common mistake! {} Instead, you should say '{}'.",
        mistake.explanation, mistake.correction
    )
}

/// Short definition card for a single vocabulary entry.
pub fn definition_card(entry: &VocabularyEntry) -> String {
    let mut card = format!(
        "**{}** ({}) - {}\n{}",
        entry.term, entry.term_target, entry.part_of_speech, entry.definition
    );
    if !entry.example.is_empty() {
        card.push_str(&format!("\n*Example: {}*", entry.example));
    }
    card
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
