//! In-memory store for tests and throwaway sessions.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use interviewbot_core::error::StoreError;
use interviewbot_core::model::{QaPair, Question, Report, Response, StoredReport};
use interviewbot_core::traits::QuestionStore;

#[derive(Default)]
struct State {
    questions: Vec<Question>,
    responses: Vec<Response>,
    reports: Vec<StoredReport>,
}

/// A [`QuestionStore`] that keeps everything in process memory.
///
/// Applies the same (question, answer) uniqueness rule as the SQL stores.
/// [`MemoryStore::set_offline`] makes every call fail with
/// [`StoreError::Unavailable`], for exercising degraded paths.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    offline: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `pairs`.
    pub fn with_questions(pairs: &[QaPair]) -> Self {
        let store = Self::new();
        store.insert_now(pairs);
        store
    }

    /// Simulate losing (or regaining) the connection.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap_or_else(|e| e.into_inner()) = offline;
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        if *self.offline.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn insert_now(&self, pairs: &[QaPair]) -> usize {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut inserted = 0;
        for pair in pairs {
            let exists = state
                .questions
                .iter()
                .any(|q| q.question == pair.question && q.answer == pair.answer);
            if exists {
                continue;
            }
            let id = state.questions.len() as i64 + 1;
            state.questions.push(Question {
                id,
                question: pair.question.clone(),
                answer: pair.answer.clone(),
            });
            inserted += 1;
        }
        inserted
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    fn kind(&self) -> &str {
        "memory"
    }

    async fn count_questions(&self) -> Result<u64, StoreError> {
        Ok(self.state()?.questions.len() as u64)
    }

    async fn insert_questions(&self, pairs: &[QaPair]) -> Result<usize, StoreError> {
        drop(self.state()?);
        Ok(self.insert_now(pairs))
    }

    async fn all_questions(&self) -> Result<Vec<Question>, StoreError> {
        Ok(self.state()?.questions.clone())
    }

    async fn record_responses(&self, responses: &[Response]) -> Result<(), StoreError> {
        self.state()?.responses.extend_from_slice(responses);
        Ok(())
    }

    async fn record_report(&self, report: &Report) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let id = state.reports.len() as i64 + 1;
        state.reports.push(StoredReport {
            id,
            candidate: report.candidate.clone(),
            score: i64::from(report.score),
            total: i64::from(report.total),
            feedback: Some(report.feedback.message().to_string()),
            eligible: report.eligible,
            created_at: Some(Utc::now()),
        });
        Ok(())
    }

    async fn list_reports(&self, candidate: Option<&str>) -> Result<Vec<StoredReport>, StoreError> {
        let state = self.state()?;
        Ok(state
            .reports
            .iter()
            .rev()
            .filter(|r| candidate.map_or(true, |c| r.candidate == c))
            .cloned()
            .collect())
    }

    async fn responses_for(&self, candidate: &str) -> Result<Vec<Response>, StoreError> {
        Ok(self
            .state()?
            .responses
            .iter()
            .filter(|r| r.candidate == candidate)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uniqueness_matches_sql_stores() {
        let store = MemoryStore::new();
        let pairs = [
            QaPair::new("What is a stack?", "LIFO"),
            QaPair::new("What is a stack?", "LIFO"),
            QaPair::new("What is a stack?", "Last in, first out"),
        ];
        assert_eq!(store.insert_questions(&pairs).await.unwrap(), 2);
        assert_eq!(store.count_questions().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryStore::with_questions(&[QaPair::new("What is DNS?", "Name resolution")]);
        store.set_offline(true);

        assert!(store.count_questions().await.unwrap_err().is_unavailable());
        assert!(store.all_questions().await.is_err());
        assert!(store
            .insert_questions(&[QaPair::new("q", "a")])
            .await
            .is_err());

        store.set_offline(false);
        assert_eq!(store.count_questions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reports_are_newest_first() {
        let store = MemoryStore::new();
        for (candidate, score) in [("Ada", 3), ("Grace", 5), ("Ada", 4)] {
            store
                .record_report(&Report {
                    candidate: candidate.into(),
                    score,
                    total: 5,
                    feedback: interviewbot_core::model::FeedbackTier::for_score(score, 5),
                    eligible: Some(score >= 3),
                })
                .await
                .unwrap();
        }

        let ada = store.list_reports(Some("Ada")).await.unwrap();
        assert_eq!(ada.len(), 2);
        assert_eq!(ada[0].score, 4);
        assert_eq!(store.list_reports(None).await.unwrap().len(), 3);
    }
}
