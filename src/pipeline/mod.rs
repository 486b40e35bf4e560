//! Stages around the chunker: getting text in and getting Markdown out.
//!
//! ## Data Flow
//!
//! ```text
//! .pdf/.md ──▶ extract ──▶ sanitize ──▶ [chunk] ──▶ rewrite ──▶ postprocess
//!              (pdfium)    (chars)                  (LLM)       (cleanup)
//! ```
//!
//! 1. [`extract`]  — read Markdown, or pull the text layer of a PDF; pdfium
//!    runs in `spawn_blocking`
//! 2. [`sanitize`] — drop characters that confuse the tokenizer and the model
//! 3. [`rewrite`]  — one LLM call per chunk with timeout and retry/backoff;
//!    the only stage with network I/O
//! 4. [`postprocess`] — deterministic fixes for chat-model quirks (fences,
//!    CRLF, heading spacing)

pub mod extract;
pub mod postprocess;
pub mod rewrite;
pub mod sanitize;
