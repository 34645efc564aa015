//! Session progress note appended to the composed context.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub exercises_started: usize,
    pub exercises_completed: usize,
    /// Mean score of completed exercises, 0–100.
    pub average_score: f64,
}

impl SessionProgress {
    /// Summarize a session from per-exercise results: `None` for exercises
    /// still open, `Some(score)` for completed ones.
    pub fn from_results(results: &[Option<u32>]) -> Self {
        let scores: Vec<u32> = results.iter().flatten().copied().collect();
        let average_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64
        };
        Self {
            exercises_started: results.len(),
            exercises_completed: scores.len(),
            average_score,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "[SESSION PROGRESS]\nExercises started: {}\nExercises completed: {}\nAverage score: {:.0}%",
            self.exercises_started, self.exercises_completed, self.average_score
        )
    }
}
