//! Error types for the question store, the scorer and the session engine.
//!
//! Defined in `interviewbot-core` so that store back ends, the supplier and
//! the CLI can classify failures without string matching.

use thiserror::Error;

/// Errors raised at the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (connect or acquire failure).
    #[error("question store unavailable: {0}")]
    Unavailable(String),

    /// A query was sent but failed.
    #[error("store query failed: {0}")]
    Query(String),

    /// The database URL names a back end we do not support.
    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),
}

impl StoreError {
    /// Returns `true` when the store itself could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Errors that prevent a session from starting or finishing.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Requested question count outside the allowed window.
    #[error("number of questions must be between 5 and 10, got {0}")]
    InvalidQuestionCount(i64),

    /// No candidate name was given.
    #[error("candidate name must not be empty")]
    MissingCandidate,

    /// More answers were submitted than questions were asked.
    #[error("received {answers} answers for {questions} questions")]
    TooManyAnswers { answers: usize, questions: usize },

    /// Scoring rejected its inputs.
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Errors from aggregate scoring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    /// Responses and references were not aligned.
    #[error("responses ({responses}) and references ({references}) differ in length")]
    LengthMismatch { responses: usize, references: usize },
}

/// Generated text could not be decoded into question/answer pairs.
///
/// The supplier turns this into "zero new questions"; it never aborts a
/// session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not decode generated questions: {reason} (output starts with: {preview:?})")]
pub struct GenerativeParseFailure {
    /// Why the last attempt failed.
    pub reason: String,
    /// The first few characters of the generated text.
    pub preview: String,
}

impl GenerativeParseFailure {
    pub(crate) fn new(reason: impl Into<String>, text: &str) -> Self {
        Self {
            reason: reason.into(),
            preview: text.trim().chars().take(60).collect(),
        }
    }
}
