//! Document cleanup: count, chunk, rewrite concurrently, reassemble.
//!
//! [`Cleaner`] owns the two collaborators the pipeline needs, a
//! [`TokenCounter`] and a [`ChunkRewriter`], plus the [`CleanupConfig`].
//! Both are trait objects so tests can plug in a word counter and a closure.
//!
//! ## All-or-nothing
//!
//! Chunks are rewritten in parallel (bounded by `config.concurrency`) and put
//! back in document order by chunk number. If any chunk still fails after its
//! retries, [`Cleaner::clean`] returns [`MdCleanError::ChunkFailed`] and no
//! Markdown at all: half-rewritten documents are never produced.

use crate::chunk::{validate, ChunkAssembler, ChunkSequence, CHUNK_SEPARATOR};
use crate::config::CleanupConfig;
use crate::error::MdCleanError;
use crate::output::{ChunkPlan, ChunkResult, CleanOutput, CleanStats};
use crate::pipeline::extract::load_document;
use crate::pipeline::postprocess::clean_markdown;
use crate::pipeline::rewrite::{rewrite_chunk, ChunkRewriter, LlmRewriter};
use crate::tokens::{TiktokenCounter, TokenCounter};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Chunk-and-rewrite driver for whole documents.
pub struct Cleaner {
    counter: Arc<dyn TokenCounter>,
    rewriter: Arc<dyn ChunkRewriter>,
    config: CleanupConfig,
}

impl Cleaner {
    pub fn new(
        counter: Arc<dyn TokenCounter>,
        rewriter: Arc<dyn ChunkRewriter>,
        config: CleanupConfig,
    ) -> Self {
        Self {
            counter,
            rewriter,
            config,
        }
    }

    /// Build the production pipeline: tiktoken for `config.tokenizer_model`
    /// and an LLM rewriter from the resolved provider.
    ///
    /// # Errors
    /// [`MdCleanError::TokenizerUnavailable`] or
    /// [`MdCleanError::ProviderNotConfigured`]; both are fatal for the run.
    pub fn from_config(config: CleanupConfig) -> Result<Self, MdCleanError> {
        let counter = TiktokenCounter::for_model(&config.tokenizer_model)?;
        let rewriter = LlmRewriter::from_config(&config)?;
        Ok(Self::new(Arc::new(counter), Arc::new(rewriter), config))
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    pub fn counter(&self) -> &dyn TokenCounter {
        self.counter.as_ref()
    }

    /// Split `document` under the configured budget.
    pub fn chunk(&self, document: &str) -> ChunkSequence {
        ChunkAssembler::new(self.counter.as_ref(), self.config.max_chunk_tokens).assemble(document)
    }

    /// Chunk `document` and describe the result without rewriting anything.
    pub fn plan(&self, document: &str) -> ChunkPlan {
        let max_tokens = self.config.max_chunk_tokens;
        let document_tokens = self.counter.count(document);
        let sequence = self.chunk(document);
        let violations = validate(&sequence, max_tokens, self.counter.as_ref());
        ChunkPlan::new(document_tokens, max_tokens, &sequence, violations)
    }

    /// Load a Markdown or PDF file and clean it.
    pub async fn clean_file(&self, path: &Path) -> Result<CleanOutput, MdCleanError> {
        info!("Cleaning {}", path.display());
        let document = load_document(path, &self.config).await?;
        self.clean(&document).await
    }

    /// Rewrite `document` chunk by chunk and join the results.
    ///
    /// # Errors
    /// [`MdCleanError::ChunkFailed`] for the first (lowest-numbered) chunk
    /// that could not be rewritten.
    pub async fn clean(&self, document: &str) -> Result<CleanOutput, MdCleanError> {
        let total_start = Instant::now();
        let max_tokens = self.config.max_chunk_tokens;

        let document_tokens = self.counter.count(document);
        let sequence = self.chunk(document);
        let violations = validate(&sequence, max_tokens, self.counter.as_ref());
        let total = sequence.len();
        info!(
            "Document has {} tokens → {} chunk(s) (budget {})",
            document_tokens, total, max_tokens
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_start(total, document_tokens);
        }

        let llm_start = Instant::now();
        let mut results = self.rewrite_all(&sequence).await;
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;
        results.sort_by_key(|r| r.chunk_num);

        let succeeded = results.iter().filter(|r| r.error.is_none()).count();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_complete(total, succeeded);
        }

        if let Some((chunk, source)) = results
            .iter()
            .find_map(|r| r.error.as_ref().map(|e| (r.chunk_num, e)))
        {
            return Err(MdCleanError::ChunkFailed {
                chunk,
                total,
                source: source.clone(),
            });
        }

        if self.config.postprocess {
            for r in &mut results {
                r.markdown = clean_markdown(&r.markdown);
            }
        }

        let markdown = join_results(&results);
        let stats = CleanStats {
            document_tokens,
            chunk_count: total,
            oversized_chunks: sequence.iter().filter(|c| c.oversized).count(),
            total_input_tokens: results.iter().map(|r| r.input_tokens as u64).sum(),
            total_output_tokens: results.iter().map(|r| r.output_tokens as u64).sum(),
            total_duration_ms: total_start.elapsed().as_millis() as u64,
            llm_duration_ms,
        };

        info!(
            "Cleanup complete: {} chunk(s), {}ms total",
            total, stats.total_duration_ms
        );

        Ok(CleanOutput {
            markdown,
            chunks: results,
            violations,
            stats,
        })
    }

    async fn rewrite_all(&self, sequence: &ChunkSequence) -> Vec<ChunkResult> {
        let total = sequence.len();
        let rewriter = self.rewriter.as_ref();
        let config = &self.config;

        stream::iter(sequence.iter().enumerate().map(|(idx, chunk)| {
            let chunk_num = idx + 1;
            async move {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_chunk_start(chunk_num, total);
                }
                debug!("Chunk {}/{}: sending {} tokens", chunk_num, total, chunk.tokens);
                let result =
                    rewrite_chunk(rewriter, chunk_num, &chunk.text, chunk.tokens, config).await;
                if let Some(ref cb) = config.progress_callback {
                    match &result.error {
                        None => cb.on_chunk_complete(chunk_num, total, result.markdown.len()),
                        Some(e) => cb.on_chunk_error(chunk_num, total, &e.to_string()),
                    }
                }
                result
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await
    }
}

impl fmt::Debug for Cleaner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleaner")
            .field("counter", &"<dyn TokenCounter>")
            .field("rewriter", &"<dyn ChunkRewriter>")
            .field("config", &self.config)
            .finish()
    }
}

/// Join rewritten chunks with a blank line; the result ends in one newline.
fn join_results(results: &[ChunkResult]) -> String {
    let parts: Vec<&str> = results
        .iter()
        .map(|r| r.markdown.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        return String::new();
    }
    let mut out = parts.join(CHUNK_SEPARATOR);
    out.push('\n');
    out
}
