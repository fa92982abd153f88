//! Question supply against real stores and a mock generator.

use std::sync::Arc;

use interviewbot_core::model::{QaPair, QuestionCount};
use interviewbot_core::supplier::{GenerationSettings, QuestionSupplier, SupplyStatus};
use interviewbot_core::traits::{LlmProvider, QuestionStore};
use interviewbot_providers::mock::MockProvider;
use interviewbot_store::{MemoryStore, SqliteStore};

fn pairs(n: usize) -> Vec<QaPair> {
    (1..=n)
        .map(|i| QaPair::new(format!("What is concept {i}?"), format!("Concept {i}")))
        .collect()
}

fn generated(n: usize) -> String {
    let items: Vec<String> = (1..=n)
        .map(|i| format!(r#"{{"question": "Generated question {i}?", "answer": "Generated answer {i}"}}"#))
        .collect();
    format!("[{}]", items.join(", "))
}

fn supplier(store: Arc<dyn QuestionStore>, generator: Arc<MockProvider>) -> QuestionSupplier {
    let generator: Arc<dyn LlmProvider> = generator;
    QuestionSupplier::new(store, Some(generator), GenerationSettings::default())
}

fn count(n: i64) -> QuestionCount {
    QuestionCount::new(n).unwrap()
}

#[tokio::test]
async fn full_store_makes_no_generator_calls() {
    let store = Arc::new(MemoryStore::with_questions(&pairs(10)));
    let generator = Arc::new(MockProvider::with_fixed_response(&generated(5)));
    let supplier = supplier(store.clone(), generator.clone());

    let outcome = supplier.ensure(count(10)).await;

    assert_eq!(outcome.status, SupplyStatus::Sufficient);
    assert_eq!(generator.call_count(), 0);
    assert_eq!(store.count_questions().await.unwrap(), 10);
}

#[tokio::test]
async fn short_store_is_backfilled_with_the_shortfall() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    store.insert_questions(&pairs(2)).await.unwrap();
    let generator = Arc::new(MockProvider::with_fixed_response(&generated(3)));
    let supplier = supplier(store.clone(), generator.clone());

    let outcome = supplier.ensure(count(5)).await;

    assert_eq!(outcome.status, SupplyStatus::Backfilled);
    assert_eq!(outcome.existing, 2);
    assert_eq!(outcome.requested, 3);
    assert_eq!(outcome.inserted, 3);
    assert_eq!(store.count_questions().await.unwrap(), 5);

    let request = generator.last_request().unwrap();
    assert!(request.prompt.contains("Generate 3 "));
    assert_eq!(request.model, "llama3");
}

#[tokio::test]
async fn duplicate_generated_pairs_are_stored_once() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let twice = r#"[
        {"question": "What is a stack?", "answer": "LIFO"},
        {"question": "What is a stack?", "answer": "LIFO"}
    ]"#;
    let generator = Arc::new(MockProvider::with_fixed_response(twice));
    let supplier = supplier(store.clone(), generator.clone());

    let first = supplier.ensure(count(5)).await;
    let second = supplier.ensure(count(5)).await;

    assert_eq!(first.inserted, 1);
    assert_eq!(second.inserted, 0);
    assert_eq!(generator.call_count(), 2);
    assert_eq!(store.count_questions().await.unwrap(), 1);
}

#[tokio::test]
async fn chatty_output_is_still_decoded() {
    let store = Arc::new(MemoryStore::new());
    let chatty = format!("Sure! Here you go:\n\n{}\n\nGood luck with the interview!", generated(5));
    let generator = Arc::new(MockProvider::with_fixed_response(&chatty));
    let supplier = supplier(store.clone(), generator);

    let outcome = supplier.ensure(count(5)).await;
    assert_eq!(outcome.inserted, 5);
}

#[tokio::test]
async fn malformed_output_inserts_nothing() {
    let store = Arc::new(MemoryStore::with_questions(&pairs(1)));
    let generator = Arc::new(MockProvider::with_fixed_response(
        "I'm sorry, I can't produce JSON right now.",
    ));
    let supplier = supplier(store.clone(), generator);

    let outcome = supplier.ensure(count(5)).await;

    assert!(matches!(outcome.status, SupplyStatus::ParseFailed(_)));
    assert!(outcome.is_degraded());
    assert_eq!(outcome.inserted, 0);
    assert_eq!(store.count_questions().await.unwrap(), 1);
}

#[tokio::test]
async fn generator_failure_is_reported() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(MockProvider::failing("connection refused"));
    let supplier = supplier(store, generator);

    let outcome = supplier.ensure(count(5)).await;
    assert_eq!(
        outcome.status,
        SupplyStatus::GeneratorFailed("connection refused".into())
    );
}

#[tokio::test]
async fn offline_store_degrades_to_empty_sample() {
    let store = Arc::new(MemoryStore::with_questions(&pairs(10)));
    store.set_offline(true);
    let generator = Arc::new(MockProvider::with_fixed_response(&generated(5)));
    let supplier = supplier(store, generator.clone());

    let outcome = supplier.ensure(count(5)).await;
    assert!(matches!(outcome.status, SupplyStatus::StoreUnavailable(_)));
    assert_eq!(generator.call_count(), 0);
    assert!(supplier.sample(5).await.is_empty());
}

#[tokio::test]
async fn sample_is_capped_and_distinct() {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    store.insert_questions(&pairs(3)).await.unwrap();
    let supplier = QuestionSupplier::new(store, None, GenerationSettings::default());

    let small = supplier.sample(10).await;
    assert_eq!(small.len(), 3);

    let mut ids: Vec<i64> = supplier.sample_seeded(3, 99).await.iter().map(|q| q.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}
