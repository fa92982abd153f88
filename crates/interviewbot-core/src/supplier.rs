//! Question supply: top up the store from the generative fallback when it
//! runs short, then sample a random working set.
//!
//! Nothing here raises past its boundary. Store and generator failures are
//! reported through [`EnsureOutcome`] and an empty sample.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::generation::{generation_prompt, parse_generated_pairs};
use crate::model::{Question, QuestionCount};
use crate::traits::{GenerateRequest, LlmProvider, QuestionStore, DEFAULT_SYSTEM_PROMPT};

/// How generation requests are built.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Max tokens for generation.
    pub max_tokens: u32,
    /// Optional system prompt override.
    pub system_prompt: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "llama3".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            system_prompt: None,
        }
    }
}

/// What `ensure` managed to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SupplyStatus {
    /// The store already held enough questions.
    Sufficient,
    /// The generator was asked for more and its output was decoded.
    Backfilled,
    /// The store was short and no generator is configured.
    GeneratorUnavailable,
    /// The generator call itself failed.
    GeneratorFailed(String),
    /// The generator answered but its output could not be decoded.
    ParseFailed(String),
    /// The store could not be counted or written to.
    StoreUnavailable(String),
}

/// Result of [`QuestionSupplier::ensure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureOutcome {
    /// Questions in the store before backfill (0 when it could not be counted).
    pub existing: u64,
    /// Pairs requested from the generator.
    pub requested: usize,
    /// Rows actually inserted.
    pub inserted: usize,
    pub status: SupplyStatus,
}

impl EnsureOutcome {
    /// `true` when the caller should warn the operator.
    pub fn is_degraded(&self) -> bool {
        !matches!(
            self.status,
            SupplyStatus::Sufficient | SupplyStatus::Backfilled
        )
    }
}

/// Keeps the question bank stocked and draws working sets from it.
pub struct QuestionSupplier {
    store: Arc<dyn QuestionStore>,
    generator: Option<Arc<dyn LlmProvider>>,
    settings: GenerationSettings,
}

impl QuestionSupplier {
    pub fn new(
        store: Arc<dyn QuestionStore>,
        generator: Option<Arc<dyn LlmProvider>>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            store,
            generator,
            settings,
        }
    }

    /// Make sure at least `count` questions exist, asking the generator for
    /// the shortfall.
    #[instrument(level = "info", skip(self), fields(store = %self.store.kind()))]
    pub async fn ensure(&self, count: QuestionCount) -> EnsureOutcome {
        let needed = count.get() as u64;

        let existing = match self.store.count_questions().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "could not count stored questions, skipping backfill");
                return EnsureOutcome {
                    existing: 0,
                    requested: 0,
                    inserted: 0,
                    status: SupplyStatus::StoreUnavailable(e.to_string()),
                };
            }
        };

        if existing >= needed {
            return EnsureOutcome {
                existing,
                requested: 0,
                inserted: 0,
                status: SupplyStatus::Sufficient,
            };
        }

        let requested = (needed - existing) as usize;
        let outcome = move |inserted, status| EnsureOutcome {
            existing,
            requested,
            inserted,
            status,
        };

        let Some(generator) = &self.generator else {
            warn!(existing, needed, "question store is short and no generator is configured");
            return outcome(0, SupplyStatus::GeneratorUnavailable);
        };

        let request = GenerateRequest {
            model: self.settings.model.clone(),
            prompt: generation_prompt(requested),
            system_prompt: Some(
                self.settings
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let response = match generator.generate(&request).await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = generator.name(), "question generation failed: {e:#}");
                return outcome(0, SupplyStatus::GeneratorFailed(format!("{e:#}")));
            }
        };

        let pairs = match parse_generated_pairs(&response.content) {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!(provider = generator.name(), error = %e, "generated output parsing failed");
                return outcome(0, SupplyStatus::ParseFailed(e.to_string()));
            }
        };

        match self.store.insert_questions(&pairs).await {
            Ok(inserted) => {
                info!(
                    provider = generator.name(),
                    decoded = pairs.len(),
                    inserted,
                    "added generated questions"
                );
                outcome(inserted, SupplyStatus::Backfilled)
            }
            Err(e) => {
                warn!(error = %e, "could not store generated questions");
                outcome(0, SupplyStatus::StoreUnavailable(e.to_string()))
            }
        }
    }

    /// Up to `n` distinct questions in random order. Empty when the store is
    /// unreachable.
    pub async fn sample(&self, n: usize) -> Vec<Question> {
        let pool = self.available().await;
        let mut rng = rand::thread_rng();
        choose_questions(pool, n, &mut rng)
    }

    /// Like [`sample`](Self::sample) but reproducible for a given seed.
    pub async fn sample_seeded(&self, n: usize, seed: u64) -> Vec<Question> {
        let pool = self.available().await;
        choose_questions(pool, n, &mut StdRng::seed_from_u64(seed))
    }

    async fn available(&self) -> Vec<Question> {
        match self.store.all_questions().await {
            Ok(all) => all,
            Err(e) => {
                warn!(error = %e, "could not load questions, returning an empty sample");
                Vec::new()
            }
        }
    }
}

/// Draw `min(n, pool.len())` questions uniformly without replacement.
pub fn choose_questions<R: Rng + ?Sized>(
    mut pool: Vec<Question>,
    n: usize,
    rng: &mut R,
) -> Vec<Question> {
    pool.shuffle(rng);
    pool.truncate(n);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: i64) -> Vec<Question> {
        (1..=n)
            .map(|id| Question {
                id,
                question: format!("Question {id}"),
                answer: format!("Answer {id}"),
            })
            .collect()
    }

    #[test]
    fn choose_caps_at_pool_size() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(choose_questions(pool(3), 10, &mut rng).len(), 3);
        assert_eq!(choose_questions(pool(12), 5, &mut rng).len(), 5);
        assert!(choose_questions(Vec::new(), 5, &mut rng).is_empty());
    }

    #[test]
    fn choose_has_no_repeats() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut ids: Vec<i64> = choose_questions(pool(10), 10, &mut rng)
            .into_iter()
            .map(|q| q.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn choose_is_reproducible_with_a_seed() {
        let a = choose_questions(pool(10), 5, &mut StdRng::seed_from_u64(1));
        let b = choose_questions(pool(10), 5, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn degraded_statuses() {
        let ok = EnsureOutcome {
            existing: 5,
            requested: 0,
            inserted: 0,
            status: SupplyStatus::Sufficient,
        };
        assert!(!ok.is_degraded());
        let parse = EnsureOutcome {
            status: SupplyStatus::ParseFailed("no list".into()),
            ..ok.clone()
        };
        assert!(parse.is_degraded());
    }
}
