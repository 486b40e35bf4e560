//! Post-condition check on a packed [`ChunkSequence`].
//!
//! The assembler only exceeds the budget for an unsplittable sentence-level
//! fragment, so a violation here is a warning, never an error: the sequence
//! is returned untouched and the caller decides what to do with the report.

use super::assemble::ChunkSequence;
use crate::tokens::TokenCounter;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A chunk whose measured size exceeds the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetViolation {
    /// 0-based position in the sequence.
    pub index: usize,
    pub tokens: usize,
    pub max_tokens: usize,
}

/// Re-measure every chunk and report those over `max_tokens`.
///
/// Each violation is also logged at WARN level.
pub fn validate(
    chunks: &ChunkSequence,
    max_tokens: usize,
    counter: &dyn TokenCounter,
) -> Vec<BudgetViolation> {
    let total = chunks.len();
    chunks
        .iter()
        .enumerate()
        .filter_map(|(index, chunk)| {
            let tokens = counter.count(&chunk.text);
            (tokens > max_tokens).then(|| {
                warn!(
                    "Chunk {}/{} has {} tokens, which exceeds the limit of {}",
                    index + 1,
                    total,
                    tokens,
                    max_tokens
                );
                BudgetViolation {
                    index,
                    tokens,
                    max_tokens,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, ChunkAssembler, Granularity};

    struct Words;

    impl TokenCounter for Words {
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            tokens: Words.count(text),
            granularity: Granularity::Paragraph,
            oversized: false,
        }
    }

    #[test]
    fn within_budget_has_no_violations() {
        let seq = ChunkSequence::from(vec![chunk("a b c"), chunk("d e")]);
        assert!(validate(&seq, 3, &Words).is_empty());
    }

    #[test]
    fn reports_index_and_count() {
        let seq = ChunkSequence::from(vec![chunk("a b"), chunk("c d e f g"), chunk("h")]);
        let v = validate(&seq, 3, &Words);
        assert_eq!(
            v,
            vec![BudgetViolation {
                index: 1,
                tokens: 5,
                max_tokens: 3
            }]
        );
    }

    #[test]
    fn flags_unsplittable_fragment_from_assembler() {
        let run_on = vec!["word"; 20].join(" ");
        let seq = ChunkAssembler::new(&Words, 8).assemble(&run_on);
        let v = validate(&seq, 8, &Words);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].tokens, 20);
        assert_eq!(seq.len(), 1, "validation must not alter the sequence");
    }
}
