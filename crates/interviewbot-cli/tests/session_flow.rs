//! End-to-end sessions through the engine, store and mock generator.

use std::sync::Arc;

use interviewbot_core::engine::InterviewEngine;
use interviewbot_core::error::SessionError;
use interviewbot_core::model::{FeedbackTier, QaPair, QuestionCount};
use interviewbot_core::report::PersistStatus;
use interviewbot_core::scoring::{Evaluation, PolicyKind};
use interviewbot_core::supplier::{GenerationSettings, QuestionSupplier, SupplyStatus};
use interviewbot_core::traits::{LlmProvider, QuestionStore};
use interviewbot_providers::mock::MockProvider;
use interviewbot_store::{MemoryStore, SqliteStore};

const GENERATED: &str = r#"Here are five questions:
[
  {"question": "What is a stack?", "answer": "A last in first out collection"},
  {"question": "What is a queue?", "answer": "A first in first out collection"},
  {"question": "What is recursion?", "answer": "A function calling itself"},
  {"question": "What is Git?", "answer": "A distributed version control system"},
  {"question": "What does HTTP stand for?", "answer": "Hypertext Transfer Protocol"}
]"#;

fn engine(
    store: Arc<dyn QuestionStore>,
    generator: Option<Arc<dyn LlmProvider>>,
    policy: PolicyKind,
) -> InterviewEngine {
    let supplier = QuestionSupplier::new(store.clone(), generator, GenerationSettings::default());
    InterviewEngine::new(supplier, store, policy.build(0.6))
}

fn count(n: i64) -> QuestionCount {
    QuestionCount::new(n).unwrap()
}

#[tokio::test]
async fn empty_store_is_backfilled_and_session_is_recorded() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let generator: Arc<dyn LlmProvider> = Arc::new(MockProvider::with_fixed_response(GENERATED));
    let engine = engine(store.clone(), Some(generator), PolicyKind::Similarity);

    let ctx = engine.start("Ada", count(5)).await.unwrap();
    assert_eq!(ctx.supply.status, SupplyStatus::Backfilled);
    assert_eq!(ctx.questions.len(), 5);

    let answers: Vec<String> = ctx.questions.iter().map(|q| q.answer.to_uppercase()).collect();
    let outcome = engine.finish(&ctx, &answers).await.unwrap();

    assert_eq!(outcome.score.score, 5);
    assert_eq!(outcome.score.feedback, FeedbackTier::Excellent);
    assert!(outcome.score.eligible);
    assert_eq!(outcome.persistence, PersistStatus::Saved);

    let reports = store.list_reports(Some("Ada")).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].score, 5);
    assert_eq!(reports[0].feedback.as_deref(), Some("Excellent work!"));
    assert_eq!(store.responses_for("Ada").await.unwrap().len(), 5);
}

#[tokio::test]
async fn every_session_writes_its_own_report() {
    let store = Arc::new(MemoryStore::new());
    let seed: Vec<QaPair> = (1..=6)
        .map(|i| QaPair::new(format!("Question {i}?"), format!("answer {i}")))
        .collect();
    store.insert_questions(&seed).await.unwrap();
    let engine = engine(store.clone(), None, PolicyKind::Similarity);

    for _ in 0..2 {
        let ctx = engine.start("Grace", count(5)).await.unwrap();
        let answers = vec!["nothing like it".to_string(); 5];
        engine.finish(&ctx, &answers).await.unwrap();
    }

    let reports = store.list_reports(Some("Grace")).await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.total == 5 && r.eligible == Some(false)));
}

#[tokio::test]
async fn containment_policy_counts_blank_answers_as_incorrect() {
    let store = Arc::new(MemoryStore::with_questions(&[
        QaPair::new("What is a stack?", "A last in first out collection"),
        QaPair::new("What is a queue?", "A first in first out collection"),
        QaPair::new("What is Git?", "A distributed version control system"),
        QaPair::new("What is recursion?", "A function calling itself"),
        QaPair::new("What is an API?", "An interface between programs"),
    ]));
    let engine = engine(store, None, PolicyKind::Containment);

    let ctx = engine.start("Linus", count(5)).await.unwrap();
    let answers: Vec<String> = ctx
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| match i {
            0 => String::new(),
            1 => "   ".to_string(),
            _ => q.answer.split_whitespace().last().unwrap_or_default().to_string(),
        })
        .collect();
    let outcome = engine.finish(&ctx, &answers).await.unwrap();

    assert_eq!(outcome.policy, "containment");
    assert_eq!(outcome.results[0].evaluation, Evaluation::Incorrect);
    assert_eq!(outcome.results[1].evaluation, Evaluation::Incorrect);
    assert_eq!(outcome.score.score, 3);
    assert_eq!(outcome.score.feedback, FeedbackTier::GoodAttempt);
    assert!(outcome.score.eligible);
}

#[test]
fn invalid_count_never_reaches_the_engine() {
    for n in [0, 4, 11, -3] {
        assert!(matches!(
            QuestionCount::new(n),
            Err(SessionError::InvalidQuestionCount(got)) if got == n
        ));
    }
}

#[tokio::test]
async fn store_outage_after_start_is_reported_in_the_outcome() {
    let store = Arc::new(MemoryStore::with_questions(
        &(1..=5)
            .map(|i| QaPair::new(format!("Q{i}?"), format!("A{i}")))
            .collect::<Vec<_>>(),
    ));
    let engine = engine(store.clone(), None, PolicyKind::Similarity);

    let ctx = engine.start("Ada", count(5)).await.unwrap();
    store.set_offline(true);

    let answers: Vec<String> = ctx.questions.iter().map(|q| q.answer.clone()).collect();
    let outcome = engine.finish(&ctx, &answers).await.unwrap();

    assert_eq!(outcome.score.score, 5);
    assert!(matches!(outcome.persistence, PersistStatus::Failed(_)));
}

#[tokio::test]
async fn transcript_roundtrips_through_json() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let generator: Arc<dyn LlmProvider> = Arc::new(MockProvider::with_fixed_response(GENERATED));
    let engine = engine(store, Some(generator), PolicyKind::Similarity);

    let ctx = engine.start("Ada", count(5)).await.unwrap();
    let outcome = engine
        .finish(&ctx, &["a last in first out collection".to_string()])
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    outcome.save_json(&path).unwrap();

    let loaded = interviewbot_core::report::SessionOutcome::load_json(&path).unwrap();
    assert_eq!(loaded.session_id, ctx.id);
    assert_eq!(loaded.score.total, 1);
    assert_eq!(loaded.results.len(), 1);
}
