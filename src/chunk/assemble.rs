//! Greedy, three-level packing of structural units into token-bounded chunks.
//!
//! ## Algorithm
//!
//! ```text
//! pack(text, level):
//!   for unit in level.split(text):
//!     unit > budget        → flush; pack(unit, level.finer())   (or emit as-is below sentences)
//!     current + unit > budget → flush; current = unit
//!     otherwise            → current += separator + unit
//!   flush
//! ```
//!
//! Sub-chunks produced for an oversized unit go straight to the output in
//! document order; they are never merged with neighbouring chunks. Depth is
//! bounded by the three granularities, so a split that fails to shrink a
//! unit ends at the sentence level instead of looping.
//!
//! Budget checks measure the joined candidate text rather than summing unit
//! counts: subword tokenizers are not additive across a separator.

use super::split::Granularity;
use crate::tokens::TokenCounter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Separator placed between chunks when a sequence is joined back together.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// A token-bounded, order-preserving slice of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Materialised text: units joined with their level's separator.
    pub text: String,
    /// Token count of `text`.
    pub tokens: usize,
    /// Granularity of the units this chunk was packed from.
    pub granularity: Granularity,
    /// A single sentence-level fragment that alone exceeds the budget.
    pub oversized: bool,
}

/// Ordered, gap-free list of chunks covering a whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSequence {
    chunks: Vec<Chunk>,
}

impl ChunkSequence {
    /// The whole document as one chunk, byte-for-byte.
    pub fn whole(document: &str, tokens: usize) -> Self {
        Self {
            chunks: vec![Chunk {
                text: document.to_string(),
                tokens,
                granularity: Granularity::Section,
                oversized: false,
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    pub fn as_slice(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Concatenate every chunk with [`CHUNK_SEPARATOR`].
    pub fn join(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR)
    }
}

impl From<Vec<Chunk>> for ChunkSequence {
    fn from(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }
}

impl IntoIterator for ChunkSequence {
    type Item = Chunk;
    type IntoIter = std::vec::IntoIter<Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChunkSequence {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// Packs a document into chunks of at most `max_tokens` tokens.
///
/// The budget is a target for one irreducible case only: a sentence-level
/// fragment that alone exceeds it is emitted unchanged with
/// [`Chunk::oversized`] set.
pub struct ChunkAssembler<'a> {
    counter: &'a dyn TokenCounter,
    max_tokens: usize,
}

impl<'a> ChunkAssembler<'a> {
    pub fn new(counter: &'a dyn TokenCounter, max_tokens: usize) -> Self {
        Self {
            counter,
            max_tokens,
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Split `document` into an ordered [`ChunkSequence`].
    ///
    /// * Blank document → zero chunks.
    /// * Document within budget → one chunk equal to the document.
    /// * Otherwise → greedy section packing, descending to paragraphs and
    ///   sentences only for units that do not fit on their own.
    pub fn assemble(&self, document: &str) -> ChunkSequence {
        if document.trim().is_empty() {
            return ChunkSequence::default();
        }

        let total = self.counter.count(document);
        if total <= self.max_tokens {
            return ChunkSequence::whole(document, total);
        }

        let chunks = self.pack(document, Granularity::Section);
        debug!(
            "Packed {} tokens into {} chunks (budget {})",
            total,
            chunks.len(),
            self.max_tokens
        );
        ChunkSequence::from(chunks)
    }

    fn pack(&self, text: &str, level: Granularity) -> Vec<Chunk> {
        let mut out = Vec::new();
        let mut current = Accumulator::new(level);

        for unit in level.split(text) {
            if unit.trim().is_empty() {
                continue;
            }
            let unit_tokens = self.counter.count(unit);

            if unit_tokens > self.max_tokens {
                out.extend(self.flush(&mut current));
                match level.finer() {
                    Some(finer) => out.extend(self.pack(unit, finer)),
                    None => out.push(self.oversized(unit)),
                }
                continue;
            }

            if current.is_empty() {
                current.push(unit);
                continue;
            }

            let candidate = current.with(unit);
            let candidate_tokens = self.counter.count(&candidate);
            if candidate_tokens > self.max_tokens {
                out.extend(self.flush(&mut current));
                current.push(unit);
            } else {
                current.replace(candidate);
            }
        }

        out.extend(self.flush(&mut current));
        out
    }

    fn flush(&self, current: &mut Accumulator) -> Option<Chunk> {
        let text = current.take()?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Chunk {
            text: text.to_string(),
            tokens: self.counter.count(text),
            granularity: current.level,
            oversized: false,
        })
    }

    fn oversized(&self, fragment: &str) -> Chunk {
        let text = fragment.trim();
        let tokens = self.counter.count(text);
        warn!(
            "Unsplittable fragment of {} tokens exceeds the {}-token budget; emitting it as its own chunk",
            tokens, self.max_tokens
        );
        Chunk {
            text: text.to_string(),
            tokens,
            granularity: Granularity::Sentence,
            oversized: true,
        }
    }
}

/// Running chunk under construction at one granularity.
struct Accumulator {
    level: Granularity,
    text: String,
}

impl Accumulator {
    fn new(level: Granularity) -> Self {
        Self {
            level,
            text: String::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn push(&mut self, unit: &str) {
        if !self.text.is_empty() {
            self.text.push_str(self.level.separator_before(unit));
        }
        self.text.push_str(unit);
    }

    /// Current text with `unit` appended, leaving `self` untouched.
    fn with(&self, unit: &str) -> String {
        let sep = self.level.separator_before(unit);
        let mut s = String::with_capacity(self.text.len() + sep.len() + unit.len());
        s.push_str(&self.text);
        s.push_str(sep);
        s.push_str(unit);
        s
    }

    fn replace(&mut self, text: String) {
        self.text = text;
    }

    fn take(&mut self) -> Option<String> {
        if self.text.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One token per whitespace-separated word.
    struct Words;

    impl TokenCounter for Words {
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    fn words(n: usize, tag: &str) -> String {
        (0..n).map(|i| format!("{tag}{i}")).collect::<Vec<_>>().join(" ")
    }

    fn normalise(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn empty_document_has_no_chunks() {
        let a = ChunkAssembler::new(&Words, 10);
        assert!(a.assemble("").is_empty());
        assert!(a.assemble("  \n\n\t ").is_empty());
    }

    #[test]
    fn small_document_is_one_verbatim_chunk() {
        let doc = "# A\n\nshort text\n\n## B\n\nmore text\n";
        let seq = ChunkAssembler::new(&Words, 8000).assemble(doc);
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.as_slice()[0].text, doc);
        assert!(!seq.as_slice()[0].oversized);
    }

    #[test]
    fn sections_that_fit_are_packed_together() {
        let doc = format!("# A\n{}\n\n# B\n{}\n\n# C\n{}\n", words(3, "a"), words(3, "b"), words(3, "c"));
        // Each section is 5 words; two fit in 10, the third does not.
        let seq = ChunkAssembler::new(&Words, 10).assemble(&doc);
        assert_eq!(seq.len(), 2);
        assert!(seq.as_slice()[0].text.starts_with("# A"));
        assert!(seq.as_slice()[0].text.contains("\n\n# B"));
        assert!(seq.as_slice()[1].text.starts_with("# C"));
    }

    #[test]
    fn oversized_section_descends_to_paragraphs() {
        let doc = format!(
            "# Big\n\n{}\n\n{}\n\n{}\n\n# Small\n{}",
            words(6, "p"),
            words(6, "q"),
            words(6, "r"),
            words(2, "s")
        );
        let seq = ChunkAssembler::new(&Words, 10).assemble(&doc);
        for c in &seq {
            assert!(c.tokens <= 10, "chunk over budget: {:?}", c);
            assert!(!c.oversized);
        }
        assert_eq!(seq.as_slice()[0].granularity, Granularity::Paragraph);
        assert!(seq.as_slice().last().unwrap().text.starts_with("# Small"));
    }

    #[test]
    fn oversized_paragraph_descends_to_sentences() {
        let para = "One two three. Four five six. Seven eight nine. Ten eleven twelve.";
        let seq = ChunkAssembler::new(&Words, 6).assemble(para);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.as_slice()[0].text, "One two three. Four five six.");
        assert_eq!(seq.as_slice()[0].granularity, Granularity::Sentence);
        assert_eq!(seq.as_slice()[1].text, "Seven eight nine. Ten eleven twelve.");
    }

    #[test]
    fn unsplittable_fragment_is_emitted_oversized() {
        let run_on = words(30, "w");
        let seq = ChunkAssembler::new(&Words, 10).assemble(&run_on);
        assert_eq!(seq.len(), 1);
        let c = &seq.as_slice()[0];
        assert!(c.oversized);
        assert_eq!(c.tokens, 30);
        assert_eq!(c.text, run_on);
    }

    #[test]
    fn oversized_fragment_does_not_swallow_neighbours() {
        let doc = format!("lead in.\n\n{}\n\ntail out.", words(30, "w"));
        let seq = ChunkAssembler::new(&Words, 10).assemble(&doc);
        let texts: Vec<&str> = seq.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0], "lead in.");
        assert!(seq.as_slice()[1].oversized);
        assert_eq!(texts[2], "tail out.");
    }

    #[test]
    fn join_preserves_every_word_in_order() {
        let doc = format!(
            "preamble words here\n\n# One\n{}\n\n{}. {}. {}.\n\n## Two\n{}\n",
            words(4, "a"),
            words(5, "b"),
            words(5, "c"),
            words(5, "d"),
            words(7, "e")
        );
        let seq = ChunkAssembler::new(&Words, 8).assemble(&doc);
        assert!(seq.len() > 1);
        assert_eq!(normalise(&seq.join()), normalise(&doc));
    }

    #[test]
    fn assemble_is_deterministic() {
        let doc = format!("# A\n{}\n\n# B\n{}. {}.", words(9, "x"), words(6, "y"), words(6, "z"));
        let a = ChunkAssembler::new(&Words, 7);
        assert_eq!(a.assemble(&doc), a.assemble(&doc));
    }

    #[test]
    fn smaller_budget_never_yields_fewer_chunks() {
        let doc = format!(
            "# A\n{}\n\n{}\n\n# B\n{}. {}. {}.\n\n# C\n{}",
            words(12, "a"),
            words(8, "b"),
            words(5, "c"),
            words(5, "d"),
            words(5, "e"),
            words(3, "f")
        );
        let budgets = [6, 10, 15, 25, 40, 100];
        let counts: Vec<usize> = budgets
            .iter()
            .map(|&b| ChunkAssembler::new(&Words, b).assemble(&doc).len())
            .collect();
        for pair in counts.windows(2) {
            assert!(pair[0] >= pair[1], "counts not monotone: {counts:?}");
        }
    }
}
