//! Short-answer grading for spoken exercise and drill answers.
//!
//! Speech-to-text output is noisy, so an answer within the bounded edit
//! allowance of any accepted form counts as correct, with a lower quality.

use lexiscope_core::curriculum::{Exercise, ExerciseItem};
use lexiscope_core::fuzzy::within_edits;
use lexiscope_core::normalize;
use serde::Serialize;
use tracing::debug;

/// Review quality on the 0–5 scale used by spaced repetition.
pub const QUALITY_EXACT: u8 = 5;
pub const QUALITY_CLOSE: u8 = 4;
pub const QUALITY_WRONG: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grade {
    pub correct: bool,
    /// True only for a verbatim (normalized) match.
    pub exact: bool,
    pub quality: u8,
    /// The primary expected answer.
    pub expected: String,
}

/// Grade `given` against the expected answer and any acceptable variants.
pub fn grade_answer(expected: &str, acceptable: &[String], given: &str) -> Grade {
    let given = normalize(given);
    let candidates: Vec<String> = std::iter::once(expected)
        .chain(acceptable.iter().map(String::as_str))
        .map(normalize)
        .filter(|c| !c.is_empty())
        .collect();

    let exact = !given.is_empty() && candidates.iter().any(|c| *c == given);
    let close = !exact && !given.is_empty() && candidates.iter().any(|c| within_edits(c, &given));

    let quality = if exact {
        QUALITY_EXACT
    } else if close {
        QUALITY_CLOSE
    } else {
        QUALITY_WRONG
    };

    Grade {
        correct: exact || close,
        exact,
        quality,
        expected: expected.to_string(),
    }
}

pub fn grade_item(item: &ExerciseItem, given: &str) -> Grade {
    grade_answer(&item.correct_answer, &item.acceptable_answers, given)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOutcome {
    pub grade: Grade,
    pub explanation: String,
    /// Offered only after a wrong answer.
    pub hint: Option<String>,
    pub has_next: bool,
    /// Final score, set when the last item was answered correctly.
    pub score: Option<u32>,
}

#[derive(Debug, Clone)]
struct Attempt {
    item_id: String,
    correct: bool,
}

/// Walks a learner through one exercise item by item.
///
/// A correct answer advances to the next item; a wrong one stays put.
#[derive(Debug, Clone)]
pub struct ExerciseTracker {
    exercise: Exercise,
    current: usize,
    attempts: Vec<Attempt>,
}

impl ExerciseTracker {
    pub fn start(exercise: Exercise) -> Self {
        debug!(exercise = %exercise.id, items = exercise.items.len(), "Exercise started");
        Self {
            exercise,
            current: 0,
            attempts: Vec::new(),
        }
    }

    pub fn current_item(&self) -> Option<&ExerciseItem> {
        self.exercise.items.get(self.current)
    }

    pub fn is_active(&self) -> bool {
        self.current < self.exercise.items.len()
    }

    /// Grade an answer to the current item. `None` once the exercise is done.
    pub fn check_answer(&mut self, given: &str) -> Option<AnswerOutcome> {
        let item = self.current_item()?;
        let grade = grade_item(item, given);
        let item_id = item_key(item, self.current);
        let explanation = item.explanation.clone();
        let hint = (!grade.correct && !item.hint.is_empty()).then(|| item.hint.clone());

        self.attempts.push(Attempt {
            item_id,
            correct: grade.correct,
        });

        let mut outcome = AnswerOutcome {
            grade,
            explanation,
            hint,
            has_next: true,
            score: None,
        };
        if outcome.grade.correct {
            self.current += 1;
            outcome.has_next = self.is_active();
            if !outcome.has_next {
                outcome.score = Some(self.score());
            }
        }
        Some(outcome)
    }

    /// Percentage (0–100) of items answered correctly at some attempt.
    pub fn score(&self) -> u32 {
        let total = self.exercise.items.len();
        if total == 0 {
            return 0;
        }
        let mut solved: Vec<&str> = self
            .attempts
            .iter()
            .filter(|a| a.correct)
            .map(|a| a.item_id.as_str())
            .collect();
        solved.sort_unstable();
        solved.dedup();
        (solved.len() * 100 / total) as u32
    }

    /// Current exercise state for prompt injection.
    pub fn render_for_context(&self) -> String {
        let Some(item) = self.current_item() else {
            return "[All exercise items completed]".into();
        };
        let key = item_key(item, self.current);
        let attempts = self.attempts.iter().filter(|a| a.item_id == key).count();
        let title = if self.exercise.title.is_empty() {
            &self.exercise.id
        } else {
            &self.exercise.title
        };

        format!(
            "[CURRENT EXERCISE: {title}]\nItem {} of {}\nQuestion: {}\nPrevious attempts on this item: {attempts}\nCorrect answer (for your reference): {}",
            self.current + 1,
            self.exercise.items.len(),
            item.question,
            item.correct_answer
        )
    }
}

fn item_key(item: &ExerciseItem, position: usize) -> String {
    if item.id.is_empty() {
        format!("item_{position}")
    } else {
        item.id.clone()
    }
}
