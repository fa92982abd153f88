//! Answer scoring: lexical similarity, pluggable correctness policies and
//! session-level aggregation.
//!
//! The similarity measure is the longest-matching-blocks ratio: find the
//! longest common run of characters, recurse on what is left on either side,
//! and report `2 * matched / (len(a) + len(b))`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::model::FeedbackTier;

/// Similarity a response needs to be counted as correct.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Fraction of the total a candidate must reach to be eligible.
pub const ELIGIBILITY_FRACTION: f64 = 0.6;

/// Ratio of matching characters between `a` and `b`, in `[0.0, 1.0]`.
///
/// Works on Unicode scalar values and applies no normalization. Two empty
/// strings are considered identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Total length of all matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b2j.entry(c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common run inside `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, k)` with `a[i..i+k] == b[j..j+k]`. Ties go to the
/// smallest `i`, then the smallest `j`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // j2len[j] = length of the run ending at a[i - 1] and b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_k)
}

/// `true` when the lowercased response is at least `threshold` similar to
/// the lowercased reference.
pub fn is_correct(response: &str, reference: &str, threshold: f64) -> bool {
    similarity_ratio(&response.to_lowercase(), &reference.to_lowercase()) >= threshold
}

/// `true` when `score` reaches [`ELIGIBILITY_FRACTION`] of `total`.
///
/// The comparison is done on the real-valued fraction, so 3 of 5 passes
/// (3 >= 3.0) while 2 of 5 does not.
pub fn is_eligible(score: u32, total: u32) -> bool {
    score as f64 >= ELIGIBILITY_FRACTION * total as f64
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Decides whether a single response counts as correct.
pub trait ScoringPolicy: Send + Sync {
    /// Policy name for logs and transcripts.
    fn name(&self) -> &str;

    /// Judge `response` against `reference`.
    fn is_correct(&self, response: &str, reference: &str) -> bool;
}

/// Similarity-ratio policy. This is the default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityPolicy {
    pub threshold: f64,
}

impl Default for SimilarityPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ScoringPolicy for SimilarityPolicy {
    fn name(&self) -> &str {
        "similarity"
    }

    fn is_correct(&self, response: &str, reference: &str) -> bool {
        is_correct(response, reference, self.threshold)
    }
}

/// Substring policy: the lowercased response must appear inside the
/// lowercased reference. Blank responses never count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainmentPolicy;

impl ScoringPolicy for ContainmentPolicy {
    fn name(&self) -> &str {
        "containment"
    }

    fn is_correct(&self, response: &str, reference: &str) -> bool {
        if response.trim().is_empty() {
            return false;
        }
        reference
            .to_lowercase()
            .contains(&response.to_lowercase())
    }
}

/// Policy selector used by configuration and the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Similarity,
    Containment,
}

impl PolicyKind {
    /// Build the policy. `threshold` only applies to [`PolicyKind::Similarity`].
    pub fn build(self, threshold: f64) -> Box<dyn ScoringPolicy> {
        match self {
            PolicyKind::Similarity => Box::new(SimilarityPolicy { threshold }),
            PolicyKind::Containment => Box::new(ContainmentPolicy),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Similarity => write!(f, "similarity"),
            PolicyKind::Containment => write!(f, "containment"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "similarity" | "ratio" => Ok(PolicyKind::Similarity),
            "containment" | "substring" => Ok(PolicyKind::Containment),
            other => Err(format!("unknown scoring policy: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Verdict for a single response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evaluation {
    Correct,
    Incorrect,
}

impl Evaluation {
    pub fn is_correct(self) -> bool {
        self == Evaluation::Correct
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Correct => write!(f, "Correct"),
            Evaluation::Incorrect => write!(f, "Incorrect"),
        }
    }
}

/// Aggregate result of scoring one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionScore {
    /// One verdict per response, in order.
    pub evaluations: Vec<Evaluation>,
    /// Number of correct responses.
    pub score: u32,
    /// Number of questions asked.
    pub total: u32,
    /// Whether the score reaches the eligibility cut.
    pub eligible: bool,
    /// Qualitative feedback tier.
    pub feedback: FeedbackTier,
}

/// Score aligned `responses` against `references`.
pub fn evaluate_session<R, E>(
    policy: &dyn ScoringPolicy,
    responses: &[R],
    references: &[E],
) -> Result<SessionScore, ScoringError>
where
    R: AsRef<str>,
    E: AsRef<str>,
{
    if responses.len() != references.len() {
        return Err(ScoringError::LengthMismatch {
            responses: responses.len(),
            references: references.len(),
        });
    }

    let evaluations: Vec<Evaluation> = responses
        .iter()
        .zip(references)
        .map(|(response, reference)| {
            if policy.is_correct(response.as_ref(), reference.as_ref()) {
                Evaluation::Correct
            } else {
                Evaluation::Incorrect
            }
        })
        .collect();

    let score = evaluations.iter().filter(|e| e.is_correct()).count() as u32;
    let total = evaluations.len() as u32;

    Ok(SessionScore {
        evaluations,
        score,
        total,
        eligible: is_eligible(score, total),
        feedback: FeedbackTier::for_score(score, total),
    })
}
