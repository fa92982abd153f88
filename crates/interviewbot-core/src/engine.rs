//! Interview session engine.
//!
//! Starts a session by stocking and sampling questions, then scores the
//! submitted answers and writes responses and the report to the store.
//! All per-session state lives in [`SessionContext`], which the caller owns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::SessionError;
use crate::model::{Question, QuestionCount, Report, Response};
use crate::report::{PersistStatus, QuestionResult, SessionOutcome};
use crate::scoring::{evaluate_session, ScoringPolicy};
use crate::supplier::{EnsureOutcome, QuestionSupplier};
use crate::traits::QuestionStore;

/// Per-session state handed back to the caller by [`InterviewEngine::start`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Unique session identifier.
    pub id: Uuid,
    /// Candidate name (trimmed).
    pub candidate: String,
    /// The size the operator asked for.
    pub requested: QuestionCount,
    /// The sampled working set. May be shorter than `requested`.
    pub questions: Vec<Question>,
    /// How question supply went.
    pub supply: EnsureOutcome,
    /// When the session started.
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    /// `true` when fewer questions were sampled than requested.
    pub fn is_short(&self) -> bool {
        self.questions.len() < self.requested.get() as usize
    }
}

/// Ties question supply, scoring and persistence together.
pub struct InterviewEngine {
    supplier: QuestionSupplier,
    store: Arc<dyn QuestionStore>,
    policy: Box<dyn ScoringPolicy>,
}

impl InterviewEngine {
    pub fn new(
        supplier: QuestionSupplier,
        store: Arc<dyn QuestionStore>,
        policy: Box<dyn ScoringPolicy>,
    ) -> Self {
        Self {
            supplier,
            store,
            policy,
        }
    }

    /// The scoring policy in use.
    pub fn policy(&self) -> &dyn ScoringPolicy {
        self.policy.as_ref()
    }

    /// Start a session for `candidate`.
    #[instrument(level = "info", skip(self))]
    pub async fn start(
        &self,
        candidate: &str,
        count: QuestionCount,
    ) -> Result<SessionContext, SessionError> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return Err(SessionError::MissingCandidate);
        }

        let supply = self.supplier.ensure(count).await;
        let questions = self.supplier.sample(count.get() as usize).await;

        let ctx = SessionContext {
            id: Uuid::new_v4(),
            candidate: candidate.to_string(),
            requested: count,
            questions,
            supply,
            started_at: Utc::now(),
        };
        if ctx.is_short() {
            warn!(
                session = %ctx.id,
                requested = count.get(),
                available = ctx.questions.len(),
                "session starts with fewer questions than requested"
            );
        }
        Ok(ctx)
    }

    /// Score `answers` for the session and persist the result.
    ///
    /// `answers[i]` answers `ctx.questions[i]`. Fewer answers than questions
    /// means the candidate stopped early; only answered questions count.
    #[instrument(level = "info", skip(self, ctx, answers), fields(session = %ctx.id))]
    pub async fn finish(
        &self,
        ctx: &SessionContext,
        answers: &[String],
    ) -> Result<SessionOutcome, SessionError> {
        if answers.len() > ctx.questions.len() {
            return Err(SessionError::TooManyAnswers {
                answers: answers.len(),
                questions: ctx.questions.len(),
            });
        }

        let asked = &ctx.questions[..answers.len()];
        let references: Vec<&str> = asked.iter().map(|q| q.answer.as_str()).collect();
        let score = evaluate_session(self.policy.as_ref(), answers, &references)?;

        let results: Vec<QuestionResult> = asked
            .iter()
            .zip(answers)
            .zip(&score.evaluations)
            .map(|((q, answer), evaluation)| QuestionResult {
                question_id: q.id,
                question: q.question.clone(),
                expected: q.answer.clone(),
                response: answer.clone(),
                evaluation: *evaluation,
            })
            .collect();

        let responses: Vec<Response> = asked
            .iter()
            .zip(answers)
            .map(|(q, answer)| Response {
                candidate: ctx.candidate.clone(),
                question_id: q.id,
                response: answer.clone(),
            })
            .collect();

        let report = Report::from_score(&ctx.candidate, &score);
        let persistence = if responses.is_empty() {
            PersistStatus::Skipped
        } else {
            self.persist(&responses, &report).await
        };

        info!(
            candidate = %ctx.candidate,
            score = score.score,
            total = score.total,
            eligible = score.eligible,
            "session scored"
        );

        Ok(SessionOutcome {
            session_id: ctx.id,
            candidate: ctx.candidate.clone(),
            policy: self.policy.name().to_string(),
            results,
            score,
            report,
            persistence,
            finished_at: Utc::now(),
        })
    }

    async fn persist(&self, responses: &[Response], report: &Report) -> PersistStatus {
        if let Err(e) = self.store.record_responses(responses).await {
            warn!(error = %e, "could not record responses");
            return PersistStatus::Failed(e.to_string());
        }
        match self.store.record_report(report).await {
            Ok(()) => PersistStatus::Saved,
            Err(e) => {
                warn!(error = %e, "could not record report");
                PersistStatus::Failed(e.to_string())
            }
        }
    }
}
