//! # edgequake-mdclean
//!
//! Turn PDFs and raw Markdown into clean, well-structured Markdown with an
//! LLM, without ever sending the model more than a fixed token budget.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .pdf / .md
//!  │
//!  ├─ 1. Extract   pdfium text layer (PDF only, spawn_blocking)
//!  ├─ 2. Sanitize  strip characters that confuse tokenizer and model
//!  ├─ 3. Chunk     section → paragraph → sentence packing under the budget
//!  ├─ 4. Rewrite   concurrent LLM calls, retry + timeout per chunk
//!  ├─ 5. Polish    deterministic post-processing per chunk
//!  └─ 6. Join      chunks in document order, blank line between
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_mdclean::{CleanupConfig, Cleaner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = CleanupConfig::builder().max_chunk_tokens(6000).build()?;
//!     let cleaner = Cleaner::from_config(config)?;
//!     let output = cleaner.clean_file("report.pdf".as_ref()).await?;
//!     println!("{}", output.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Chunking only
//!
//! The chunker needs nothing but a [`TokenCounter`]:
//!
//! ```rust
//! use edgequake_mdclean::{ChunkAssembler, TokenCounter};
//!
//! struct Words;
//! impl TokenCounter for Words {
//!     fn count(&self, text: &str) -> usize {
//!         text.split_whitespace().count()
//!     }
//! }
//!
//! let doc = "# One\nalpha beta\n\n# Two\ngamma delta";
//! let chunks = ChunkAssembler::new(&Words, 4).assemble(doc);
//! assert_eq!(chunks.len(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mdclean` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod chunk;
pub mod clean;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod tokens;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{clean_path, count_path, extract_path, BatchOptions, BatchReport, TokenTally};
pub use chunk::{validate, BudgetViolation, Chunk, ChunkAssembler, ChunkSequence, Granularity};
pub use clean::Cleaner;
pub use config::{CleanupConfig, CleanupConfigBuilder, PageSeparator};
pub use error::{ChunkError, MdCleanError};
pub use output::{ChunkPlan, ChunkResult, CleanOutput, CleanStats};
pub use pipeline::rewrite::{ChunkRewriter, LlmRewriter, Rewritten};
pub use progress::{CleanupProgressCallback, NoopProgressCallback, ProgressCallback};
pub use tokens::{TiktokenCounter, TokenCounter};
