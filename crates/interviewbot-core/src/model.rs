//! Core data model types for interviewbot.
//!
//! Questions live in the store, responses and reports are append-only
//! records produced by a finished session.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::scoring::SessionScore;

/// Smallest number of questions a session may ask.
pub const MIN_QUESTIONS: u32 = 5;
/// Largest number of questions a session may ask.
pub const MAX_QUESTIONS: u32 = 10;

/// A stored interview question with its reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Store-assigned identifier.
    pub id: i64,
    /// The question text shown to the candidate.
    pub question: String,
    /// The reference answer used for scoring.
    pub answer: String,
}

/// A question/answer pair that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QaPair {
    #[serde(alias = "q")]
    pub question: String,
    #[serde(alias = "a")]
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// One submitted answer, tied to a question from the same session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub candidate: String,
    pub question_id: i64,
    pub response: String,
}

/// Qualitative feedback chosen from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTier {
    Excellent,
    GoodAttempt,
    NeedsImprovement,
}

impl FeedbackTier {
    /// Pick the tier for `score` out of `total`.
    ///
    /// Checked in order: all correct, at least `total / 2` (floor) correct,
    /// everything else.
    pub fn for_score(score: u32, total: u32) -> Self {
        if score == total {
            FeedbackTier::Excellent
        } else if score >= total / 2 {
            FeedbackTier::GoodAttempt
        } else {
            FeedbackTier::NeedsImprovement
        }
    }

    /// The text shown to the candidate and stored in the report.
    pub fn message(&self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Excellent work!",
            FeedbackTier::GoodAttempt => "Good attempt, but review some basics.",
            FeedbackTier::NeedsImprovement => "Needs improvement.",
        }
    }
}

impl fmt::Display for FeedbackTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl FromStr for FeedbackTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Excellent work!" | "excellent" => Ok(FeedbackTier::Excellent),
            "Good attempt, but review some basics." | "good_attempt" => {
                Ok(FeedbackTier::GoodAttempt)
            }
            "Needs improvement." | "needs_improvement" => Ok(FeedbackTier::NeedsImprovement),
            other => Err(format!("unknown feedback tier: {other}")),
        }
    }
}

/// End-of-session summary written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub candidate: String,
    pub score: u32,
    pub total: u32,
    pub feedback: FeedbackTier,
    /// Pass/fail flag, always derived from `score` and `total`.
    pub eligible: Option<bool>,
}

impl Report {
    /// Build the report for `candidate` from an aggregate score.
    pub fn from_score(candidate: &str, score: &SessionScore) -> Self {
        Self {
            candidate: candidate.to_string(),
            score: score.score,
            total: score.total,
            feedback: score.feedback,
            eligible: Some(score.eligible),
        }
    }
}

/// A report row read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: i64,
    pub candidate: String,
    pub score: i64,
    pub total: i64,
    /// Feedback text; older rows may not have one.
    pub feedback: Option<String>,
    pub eligible: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A requested session size, validated against
/// [`MIN_QUESTIONS`]..=[`MAX_QUESTIONS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct QuestionCount(u32);

impl QuestionCount {
    pub fn new(n: i64) -> Result<Self, SessionError> {
        if (MIN_QUESTIONS as i64..=MAX_QUESTIONS as i64).contains(&n) {
            Ok(Self(n as u32))
        } else {
            Err(SessionError::InvalidQuestionCount(n))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for QuestionCount {
    fn default() -> Self {
        Self(MIN_QUESTIONS)
    }
}

impl TryFrom<i64> for QuestionCount {
    type Error = SessionError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        QuestionCount::new(n)
    }
}

impl From<QuestionCount> for u32 {
    fn from(count: QuestionCount) -> Self {
        count.0
    }
}

impl fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QuestionCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: i64 = s
            .trim()
            .parse()
            .map_err(|_| format!("not a number: {}", s.trim()))?;
        QuestionCount::new(n).map_err(|e| e.to_string())
    }
}

/// A curated set of questions loaded from a TOML file, used to seed a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<BankQuestion>,
}

/// One entry in a [`QuestionBank`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankQuestion {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl QuestionBank {
    /// The bank's entries as pairs ready for insertion.
    pub fn pairs(&self) -> Vec<QaPair> {
        self.questions
            .iter()
            .map(|q| QaPair::new(q.question.trim(), q.answer.trim()))
            .collect()
    }
}
