//! Grading orchestrator.
//!
//! Loads a quiz item, embeds the submitted answer, scores it against the
//! stored reference embedding, and records the attempt exactly once. Batch
//! variants run items with bounded parallelism and collect per-item errors.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{GradingError, ProviderError, StoreError};
use crate::model::{
    GradeState, GradingResult, NewQuizItem, QuizItem, SimilarityMetric, Submission, Verdict,
};
use crate::policy::{self, DEFAULT_THRESHOLD};
use crate::report::{BatchEntry, BatchOutcome, BatchReport};
use crate::similarity;
use crate::traits::{AttemptUpdate, EmbedRequest, Embedding, EmbeddingProvider, QuizStore};

/// Configuration injected into the grader at construction time.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// Embedding model used for references and submissions.
    pub model: String,
    /// Scores strictly above this are correct.
    pub threshold: f64,
    /// How embeddings are compared.
    pub metric: SimilarityMetric,
    /// Upper bound on a single embedding call.
    pub embed_timeout: Duration,
    /// Writes attempted before a lost compare-and-swap is surfaced.
    pub max_write_attempts: u32,
    /// Maximum concurrent items in batch operations.
    pub parallelism: usize,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            threshold: DEFAULT_THRESHOLD,
            metric: SimilarityMetric::Dot,
            embed_timeout: Duration::from_secs(30),
            max_write_attempts: 3,
            parallelism: 4,
        }
    }
}

/// Progress reporting for batch operations.
pub trait ProgressReporter: Send + Sync {
    fn on_item_complete(&self, key: &str);
    fn on_item_error(&self, key: &str, error: &GradingError);
    fn on_batch_complete(&self, total: usize, succeeded: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_item_complete(&self, _: &str) {}
    fn on_item_error(&self, _: &str, _: &GradingError) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// The grading orchestrator.
pub struct Grader {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn QuizStore>,
    config: GraderConfig,
}

impl Grader {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn QuizStore>,
        config: GraderConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn QuizStore> {
        &self.store
    }

    /// Grade one free-text answer.
    ///
    /// Items already marked correct are returned as-is without calling the
    /// provider. Every failure before the final write leaves the item
    /// untouched.
    #[instrument(skip(self, answer), fields(provider = self.provider.name()))]
    pub async fn grade_submission(
        &self,
        quiz_id: &str,
        answer: &str,
    ) -> Result<GradingResult, GradingError> {
        let item = self.store.get(quiz_id).await?;
        if item.is_correct() {
            debug!("already correct after {} tries", item.tries);
            return Ok(already_correct(&item));
        }
        if answer.trim().is_empty() {
            return Err(GradingError::InvalidInput("answer is empty".into()));
        }
        self.check_reference_model(&item)?;

        let submission = self.embed(answer).await?;
        let score = similarity::score_with(
            self.config.metric,
            &submission.vector,
            &item.reference_embedding,
        )?;
        let verdict = policy::decide(score, self.config.threshold);
        debug!(score, %verdict, "scored submission");

        self.record(item, verdict, score).await
    }

    /// Embed the reference answer and insert a new quiz item.
    #[instrument(skip(self, new_item), fields(note_id = %new_item.note_id))]
    pub async fn create_item(&self, new_item: NewQuizItem) -> Result<QuizItem, GradingError> {
        if new_item.question.trim().is_empty() {
            return Err(GradingError::InvalidInput("question is empty".into()));
        }
        if new_item.reference_answer.trim().is_empty() {
            return Err(GradingError::InvalidInput("reference answer is empty".into()));
        }

        let embedding = self.embed(&new_item.reference_answer).await?;
        let item = QuizItem {
            id: new_item
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            note_id: new_item.note_id,
            student_id: new_item.student_id,
            question: new_item.question,
            reference_answer: new_item.reference_answer,
            reference_embedding: embedding.vector,
            embedding_model: self.config.model.clone(),
            graded: GradeState::Ungraded,
            tries: 0,
            created_at: Utc::now(),
            graded_at: None,
        };
        self.store.insert(item.clone()).await?;
        info!(
            quiz_id = %item.id,
            dimensions = item.reference_embedding.len(),
            "created quiz item"
        );
        Ok(item)
    }

    /// Re-derive the reference embedding with the configured model.
    ///
    /// Grading state is left as it is.
    #[instrument(skip(self))]
    pub async fn regenerate_reference(&self, quiz_id: &str) -> Result<QuizItem, GradingError> {
        let mut item = self.store.get(quiz_id).await?;
        let embedding = self.embed(&item.reference_answer).await?;
        let embedding = Embedding {
            vector: embedding.vector,
            model: self.config.model.clone(),
        };
        self.store.replace_embedding(quiz_id, &embedding).await?;
        info!(
            from = %item.embedding_model,
            to = %embedding.model,
            "regenerated reference embedding"
        );
        item.reference_embedding = embedding.vector;
        item.embedding_model = embedding.model;
        Ok(item)
    }

    /// Grade many submissions, awaiting every one and keeping input order.
    pub async fn grade_batch(
        &self,
        submissions: Vec<Submission>,
        progress: &dyn ProgressReporter,
    ) -> BatchReport<GradingResult> {
        self.run_batch(
            submissions,
            |s| s.quiz_id.clone(),
            |s| async move { self.grade_submission(&s.quiz_id, &s.answer).await },
            progress,
        )
        .await
    }

    /// Create many quiz items, awaiting every insert and keeping input order.
    pub async fn create_batch(
        &self,
        items: Vec<NewQuizItem>,
        progress: &dyn ProgressReporter,
    ) -> BatchReport<QuizItem> {
        self.run_batch(
            items.into_iter().enumerate().collect::<Vec<_>>(),
            |(index, item)| item.id.clone().unwrap_or_else(|| format!("#{index}")),
            |(_, item)| self.create_item(item),
            progress,
        )
        .await
    }

    async fn run_batch<I, T, K, F, Fut>(
        &self,
        inputs: Vec<I>,
        key_of: K,
        op: F,
        progress: &dyn ProgressReporter,
    ) -> BatchReport<T>
    where
        K: Fn(&I) -> String,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, GradingError>>,
    {
        let start = Instant::now();
        let total = inputs.len();

        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));

        let mut pending = FuturesUnordered::new();
        for (index, input) in inputs.into_iter().enumerate() {
            let key = key_of(&input);
            let semaphore = Arc::clone(&semaphore);
            let fut = op(input);
            pending.push(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, key, fut.await)
            });
        }

        let mut entries = Vec::with_capacity(total);
        let mut failed = 0usize;
        while let Some((index, key, result)) = pending.next().await {
            let outcome = match result {
                Ok(value) => {
                    progress.on_item_complete(&key);
                    BatchOutcome::Succeeded { value }
                }
                Err(e) => {
                    debug!("batch item {key} failed: {e}");
                    progress.on_item_error(&key, &e);
                    failed += 1;
                    BatchOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            entries.push((index, BatchEntry { key, outcome }));
        }
        entries.sort_by_key(|(index, _)| *index);

        let elapsed = start.elapsed();
        progress.on_batch_complete(total, total - failed, failed, elapsed);

        BatchReport {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            entries: entries.into_iter().map(|(_, entry)| entry).collect(),
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    async fn embed(&self, text: &str) -> Result<Embedding, GradingError> {
        let request = EmbedRequest {
            model: self.config.model.clone(),
            text: text.to_string(),
        };
        let embedding =
            tokio::time::timeout(self.config.embed_timeout, self.provider.embed(&request))
                .await
                .map_err(|_| ProviderError::Timeout(self.config.embed_timeout.as_secs()))??;
        if embedding.vector.is_empty() {
            return Err(ProviderError::MalformedResponse("empty embedding vector".into()).into());
        }
        Ok(embedding)
    }

    fn check_reference_model(&self, item: &QuizItem) -> Result<(), GradingError> {
        if item.embedding_model != self.config.model {
            return Err(GradingError::StaleEmbedding {
                reference: item.embedding_model.clone(),
                configured: self.config.model.clone(),
            });
        }
        Ok(())
    }

    /// Write the attempt with a compare-and-swap on `tries`.
    ///
    /// A lost race reloads the item: if a concurrent attempt already marked
    /// it correct that verdict wins, otherwise the write is retried against
    /// the fresh count.
    async fn record(
        &self,
        mut item: QuizItem,
        verdict: Verdict,
        score: f64,
    ) -> Result<GradingResult, GradingError> {
        let mut attempt = 1;
        loop {
            let tries = item
                .tries
                .checked_add(1)
                .ok_or_else(|| GradingError::TriesExhausted(item.id.clone()))?;
            let update = AttemptUpdate {
                expected_tries: item.tries,
                tries,
                graded: match verdict {
                    Verdict::Correct => GradeState::Correct,
                    Verdict::Incorrect => item.graded,
                },
                graded_at: (verdict == Verdict::Correct).then(Utc::now),
            };

            match self.store.record_attempt(&item.id, &update).await {
                Ok(()) => {
                    info!(quiz_id = %item.id, %verdict, score, tries = update.tries, "graded");
                    return Ok(GradingResult {
                        quiz_id: item.id,
                        verdict,
                        score: Some(score),
                        tries: update.tries,
                        already_graded: false,
                    });
                }
                Err(StoreError::Conflict {
                    expected, actual, ..
                }) if attempt < self.config.max_write_attempts => {
                    warn!(
                        quiz_id = %item.id,
                        expected,
                        actual,
                        attempt,
                        "concurrent write, reloading"
                    );
                    attempt += 1;
                    item = self.store.get(&item.id).await?;
                    if item.is_correct() {
                        return Ok(already_correct(&item));
                    }
                    self.check_reference_model(&item)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn already_correct(item: &QuizItem) -> GradingResult {
    GradingResult {
        quiz_id: item.id.clone(),
        verdict: Verdict::Correct,
        score: None,
        tries: item.tries,
        already_graded: true,
    }
}
