//! The question-answering pipeline.
//!
//! A query moves through fixed stages: embed, search the vector index,
//! rerank the candidates, assemble a context block, generate the
//! answer. Each gateway stage gets a bounded retry; a stage that still
//! fails fails the whole request with that stage attached. The whole
//! run sits under a single deadline derived from the stage budgets.

use crate::answer;
use crate::assemble::ContextAssembler;
use crate::corpus::Corpus;
use crate::index::{self, VectorIndex};
use crate::language::QueryLanguage;
use crate::types::{Answer, RankedCandidate};
use qanun_core::{AppConfig, AppError, AppResult, GatewayStage};
use qanun_gateway::{with_retry, Embedder, Generator, Reranker};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Slack added on top of the per-stage budgets when computing the
/// whole-request deadline.
const TOTAL_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Progress marker for a request moving through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Embedded,
    Retrieved,
    Reranked,
    Assembled,
    Answered,
    Failed(GatewayStage),
}

/// Corpus and index pair, verified to be in sync at load time.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub corpus: Corpus,
    pub index: VectorIndex,
}

impl SearchState {
    pub fn load(corpus_path: &Path, index_path: &Path) -> AppResult<Self> {
        let corpus = Corpus::load(corpus_path)?;
        let index = VectorIndex::read_file(index_path)?;
        index::verify_sync(&corpus, &index)?;
        Ok(Self { corpus, index })
    }
}

/// Tuning knobs for a pipeline, normally taken from the config file.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub search_breadth: usize,
    pub rerank_breadth: usize,
    pub context_budget_chars: usize,
    pub embedding_timeout: Duration,
    pub rerank_timeout: Duration,
    pub generation_timeout: Duration,
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            search_breadth: config.retrieval.search_breadth,
            rerank_breadth: config.retrieval.rerank_breadth,
            context_budget_chars: config.retrieval.context_budget_chars,
            embedding_timeout: config.gateway.embedding_timeout(),
            rerank_timeout: config.gateway.rerank_timeout(),
            generation_timeout: config.gateway.generation_timeout(),
            retries: config.gateway.retries,
            retry_backoff: config.gateway.retry_backoff(),
        }
    }

    /// Whole-request deadline: every gateway stage may spend its full
    /// budget on every attempt, plus a fixed margin.
    pub fn total_timeout(&self) -> Duration {
        let attempts = self.retries + 1;
        (self.embedding_timeout + self.rerank_timeout + self.generation_timeout) * attempts
            + TOTAL_TIMEOUT_MARGIN
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            search_breadth: 50,
            rerank_breadth: 5,
            context_budget_chars: 12_000,
            embedding_timeout: Duration::from_secs(10),
            rerank_timeout: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(30),
            retries: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Result of a pipeline run that did not error.
#[derive(Debug, Clone)]
pub enum AskOutcome {
    /// The generator produced an answer grounded in the context.
    Answered {
        answer: Answer,
        context_articles: Vec<String>,
        truncated_context: bool,
    },
    /// Retrieval or reranking left no candidates to answer from.
    NoInformation { language: QueryLanguage },
}

pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    reranker: Arc<dyn Reranker>,
    generator: Arc<dyn Generator>,
    assembler: ContextAssembler,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        reranker: Arc<dyn Reranker>,
        generator: Arc<dyn Generator>,
        options: PipelineOptions,
    ) -> Self {
        let assembler = ContextAssembler::new(options.context_budget_chars);
        Self {
            embedder,
            reranker,
            generator,
            assembler,
            options,
        }
    }

    /// Runs the full pipeline for one query under the whole-request
    /// deadline. Dropping the returned future cancels the run.
    pub async fn ask(&self, state: &SearchState, query: &str) -> AppResult<AskOutcome> {
        let mut progress = PipelineStage::Received;
        let result = tokio::time::timeout(
            self.options.total_timeout(),
            self.run(state, query, &mut progress),
        )
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                let stage = deadline_stage(progress);
                tracing::error!("Request exceeded the total deadline in {} stage", stage);
                Err(AppError::GatewayTimeout { stage })
            }
        }
    }

    async fn run(
        &self,
        state: &SearchState,
        query: &str,
        progress: &mut PipelineStage,
    ) -> AppResult<AskOutcome> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidQuery("Query is empty".to_string()));
        }
        let language = QueryLanguage::detect(trimmed);
        tracing::debug!("Running pipeline for a {} query", language.name());

        let embedding = match with_retry(
            GatewayStage::Embedding,
            self.options.embedding_timeout,
            self.options.retries,
            self.options.retry_backoff,
            || self.embedder.embed(trimmed),
        )
        .await
        {
            Ok(embedding) => embedding,
            Err(error) => return Err(fail(progress, error)),
        };
        *progress = PipelineStage::Embedded;

        let candidates = state.index.search(&embedding, self.options.search_breadth)?;
        *progress = PipelineStage::Retrieved;
        if candidates.is_empty() {
            tracing::info!("Similarity search produced no candidates");
            return Ok(AskOutcome::NoInformation { language });
        }

        // Parallel lists keep rerank result indexes aligned with
        // corpus positions.
        let mut documents = Vec::with_capacity(candidates.len());
        let mut positions = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            match state.corpus.get(candidate.position) {
                Some(chunk) => {
                    documents.push(chunk.text.clone());
                    positions.push(candidate.position);
                }
                None => tracing::warn!(
                    "Search hit {} is outside the corpus, skipping",
                    candidate.position
                ),
            }
        }
        if documents.is_empty() {
            return Ok(AskOutcome::NoInformation { language });
        }

        let ranked_items = match with_retry(
            GatewayStage::Rerank,
            self.options.rerank_timeout,
            self.options.retries,
            self.options.retry_backoff,
            || {
                self.reranker
                    .rerank(trimmed, &documents, self.options.rerank_breadth)
            },
        )
        .await
        {
            Ok(items) => items,
            Err(error) => return Err(fail(progress, error)),
        };
        *progress = PipelineStage::Reranked;

        let ranked: Vec<RankedCandidate> = ranked_items
            .iter()
            .filter_map(|item| {
                positions.get(item.index).map(|&position| RankedCandidate {
                    position,
                    relevance_score: item.relevance_score,
                })
            })
            .collect();
        if ranked.is_empty() {
            tracing::info!("Reranking left no usable candidates");
            return Ok(AskOutcome::NoInformation { language });
        }

        let context = self.assembler.assemble(&state.corpus, &ranked);
        *progress = PipelineStage::Assembled;
        if context.entries.is_empty() {
            return Ok(AskOutcome::NoInformation { language });
        }
        if context.truncated {
            tracing::warn!("Context was truncated to fit the character budget");
        }

        let system = answer::build_system_prompt(&state.corpus.definitions().text);
        let user = answer::build_user_prompt(trimmed, language, &context);

        let raw = match with_retry(
            GatewayStage::Generation,
            self.options.generation_timeout,
            self.options.retries,
            self.options.retry_backoff,
            || self.generator.generate(&system, &user),
        )
        .await
        {
            Ok(raw) => raw,
            Err(error) => return Err(fail(progress, error)),
        };

        let parsed = answer::parse_answer(&raw);
        let unknown = answer::verify_citations(&parsed.text, &context);
        if !unknown.is_empty() {
            tracing::warn!(
                "Answer cites articles outside the context: {}",
                unknown.join(", ")
            );
        }

        let context_articles: Vec<String> = context
            .entries
            .iter()
            .map(|entry| entry.article_ref.clone())
            .collect();
        *progress = PipelineStage::Answered;
        tracing::info!(
            "Answered with {} context articles and {} related questions",
            context_articles.len(),
            parsed.related_questions.len()
        );

        Ok(AskOutcome::Answered {
            answer: parsed,
            context_articles,
            truncated_context: context.truncated,
        })
    }
}

/// Marks the failed stage on the progress marker and hands the error
/// back for propagation.
fn fail(progress: &mut PipelineStage, error: AppError) -> AppError {
    if let Some(stage) = error.gateway_stage() {
        *progress = PipelineStage::Failed(stage);
        tracing::error!("Pipeline failed in {} stage: {}", stage, error);
    }
    error
}

/// Maps how far a timed-out request got to the gateway stage it was
/// most plausibly stuck in.
fn deadline_stage(progress: PipelineStage) -> GatewayStage {
    match progress {
        PipelineStage::Received => GatewayStage::Embedding,
        PipelineStage::Embedded | PipelineStage::Retrieved => GatewayStage::Rerank,
        PipelineStage::Reranked | PipelineStage::Assembled | PipelineStage::Answered => {
            GatewayStage::Generation
        }
        PipelineStage::Failed(stage) => stage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_timeout_covers_every_attempt_of_every_stage() {
        let options = PipelineOptions::default();
        // (10 + 10 + 30) * 2 attempts + 5s margin.
        assert_eq!(options.total_timeout(), Duration::from_secs(105));

        let no_retries = PipelineOptions {
            retries: 0,
            ..PipelineOptions::default()
        };
        assert_eq!(no_retries.total_timeout(), Duration::from_secs(55));
    }

    #[test]
    fn deadline_attribution_follows_progress() {
        assert_eq!(
            deadline_stage(PipelineStage::Received),
            GatewayStage::Embedding
        );
        assert_eq!(
            deadline_stage(PipelineStage::Embedded),
            GatewayStage::Rerank
        );
        assert_eq!(
            deadline_stage(PipelineStage::Retrieved),
            GatewayStage::Rerank
        );
        assert_eq!(
            deadline_stage(PipelineStage::Reranked),
            GatewayStage::Generation
        );
        assert_eq!(
            deadline_stage(PipelineStage::Failed(GatewayStage::Embedding)),
            GatewayStage::Embedding
        );
    }
}
