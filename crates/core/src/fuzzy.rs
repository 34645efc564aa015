//! Fuzzy string matching primitives.
//!
//! Pure-Rust implementations of:
//! - Ratio similarity (matching-blocks, `2*M / T`) for "close enough to a
//!   known trigger" decisions
//! - Bounded Levenshtein distance for short-answer grading of spoken input
//!
//! Neither primitive fails; "no match" is an ordinary result.

/// Minimum length (in chars) at which two edits are tolerated instead of one.
pub const LONG_WORD_CHARS: usize = 8;

/// Similarity ratio between two strings in `[0.0, 1.0]`.
///
/// Counts characters in matching blocks found by repeatedly taking the
/// longest common substring and recursing on both sides of it, then returns
/// `2 * matches / (len(a) + len(b))`. Two empty strings are identical (1.0).
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`.
/// Returns `(start_a, start_b, len)`; ties resolve to the earliest block.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let width = bhi.saturating_sub(blo);
    if width == 0 || ahi <= alo {
        return best;
    }

    // prev[jj] = length of common suffix ending at (i-1, blo+jj-1)
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let jj = j - blo + 1;
            if a[i] == b[j] {
                let run = prev[jj - 1] + 1;
                curr[jj] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            } else {
                curr[jj] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}

/// Threshold-based ratio matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    threshold: f64,
}

impl Similarity {
    /// Default pass/fail threshold for trigger matching.
    pub const DEFAULT_THRESHOLD: f64 = 0.75;

    /// Create a matcher; the threshold is clamped to `[0.0, 1.0]`.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether `a` and `b` are at least `threshold` similar.
    pub fn passes(&self, a: &str, b: &str) -> bool {
        self.score(a, b).is_some()
    }

    /// Whether the ratio is strictly above `threshold`.
    pub fn exceeds(&self, a: &str, b: &str) -> bool {
        ratio(a, b) > self.threshold
    }

    /// The ratio, if it clears the threshold.
    pub fn score(&self, a: &str, b: &str) -> Option<f64> {
        let r = ratio(a, b);
        (r >= self.threshold).then_some(r)
    }
}

impl Default for Similarity {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

/// Full Levenshtein distance (insert / delete / substitute, unit cost).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Levenshtein distance if it is at most `max`, otherwise `None`.
///
/// Exits early when the length difference alone exceeds `max`, or when every
/// cell of a DP row exceeds `max` (the distance can only grow from there).
pub fn levenshtein_within(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        let d = a.len().max(b.len());
        return (d <= max).then_some(d);
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
            row_min = row_min.min(curr[j + 1]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let d = prev[b.len()];
    (d <= max).then_some(d)
}

/// Edits tolerated for an expected answer: 1 under 8 chars, 2 otherwise.
pub fn allowed_edits(expected: &str) -> usize {
    if expected.chars().count() < LONG_WORD_CHARS {
        1
    } else {
        2
    }
}

/// Whether `given` is within the length-scaled edit budget of `expected`.
pub fn within_edits(expected: &str, given: &str) -> bool {
    levenshtein_within(expected, given, allowed_edits(expected)).is_some()
}
