//! Token-bounded chunking of Markdown documents.
//!
//! ```text
//! document ──▶ split ──▶ assemble ──▶ validate
//!              (units)   (greedy pack)  (budget report)
//! ```
//!
//! 1. [`split`]    — section / paragraph / sentence units, borrowed from the input
//! 2. [`assemble`] — greedy packing under a token budget, descending a level
//!    only for units that do not fit alone
//! 3. [`validate`] — re-measure the result and report any chunk over budget
//!
//! Everything here is synchronous and pure with respect to its inputs; the
//! only collaborator is the [`crate::tokens::TokenCounter`] passed in.

pub mod assemble;
pub mod split;
pub mod validate;

pub use assemble::{Chunk, ChunkAssembler, ChunkSequence, CHUNK_SEPARATOR};
pub use split::{split_paragraphs, split_sections, split_sentences, Granularity};
pub use validate::{validate, BudgetViolation};
