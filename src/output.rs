//! Result types returned by [`crate::clean::Cleaner`].

use crate::chunk::{BudgetViolation, ChunkSequence, Granularity};
use crate::error::ChunkError;
use serde::Serialize;

/// A cleaned document plus per-chunk detail.
#[derive(Debug, Clone, Serialize)]
pub struct CleanOutput {
    /// Rewritten chunks joined with a blank line, ending in one newline.
    /// Empty for an empty document.
    pub markdown: String,
    /// One entry per chunk, in document order.
    pub chunks: Vec<ChunkResult>,
    /// Chunks that went over budget (unsplittable fragments).
    pub violations: Vec<BudgetViolation>,
    pub stats: CleanStats,
}

/// Outcome of rewriting one chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkResult {
    /// 1-indexed position in the document.
    pub chunk_num: usize,
    /// Tokens in the chunk that was sent.
    pub source_tokens: usize,
    /// Rewritten Markdown; empty when `error` is set.
    pub markdown: String,
    /// Prompt tokens reported by the provider.
    pub input_tokens: usize,
    /// Completion tokens reported by the provider.
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Retries used before the final attempt.
    pub retries: u32,
    pub error: Option<ChunkError>,
}

/// Aggregate numbers for one document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanStats {
    /// Tokens in the sanitised input document.
    pub document_tokens: usize,
    pub chunk_count: usize,
    pub oversized_chunks: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub llm_duration_ms: u64,
}

/// What a document would be sent as, without calling the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkPlan {
    pub document_tokens: usize,
    pub max_tokens: usize,
    pub chunks: Vec<PlannedChunk>,
    pub violations: Vec<BudgetViolation>,
}

/// One row of a [`ChunkPlan`].
#[derive(Debug, Clone, Serialize)]
pub struct PlannedChunk {
    pub chunk_num: usize,
    pub tokens: usize,
    pub granularity: Granularity,
    pub oversized: bool,
}

impl ChunkPlan {
    pub(crate) fn new(
        document_tokens: usize,
        max_tokens: usize,
        sequence: &ChunkSequence,
        violations: Vec<BudgetViolation>,
    ) -> Self {
        let chunks = sequence
            .iter()
            .enumerate()
            .map(|(i, c)| PlannedChunk {
                chunk_num: i + 1,
                tokens: c.tokens,
                granularity: c.granularity,
                oversized: c.oversized,
            })
            .collect();
        Self {
            document_tokens,
            max_tokens,
            chunks,
            violations,
        }
    }
}
