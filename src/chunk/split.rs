//! Structural decomposition of Markdown at three nested granularities.
//!
//! All three splitters are total: they never fail, and text with no internal
//! boundary comes back as a one-element vector equal to the input. Units are
//! borrowed slices of the input, so splitting allocates only the vector.
//!
//! | Level     | Boundary                                  | Delimiter kept? | Rejoined with |
//! |-----------|-------------------------------------------|-----------------|---------------|
//! | Section   | line start followed by `#…# `             | yes (in units)  | nothing, or a blank line before non-heading text |
//! | Paragraph | one or more blank lines                   | no              | `\n\n`        |
//! | Sentence  | `.` `!` `?` followed by whitespace        | punctuation only | a single space |

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_HEADING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+ ").unwrap());

static RE_HEADING_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#+ ").unwrap());

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n)+").unwrap());

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Granularity of a structural unit, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Section,
    Paragraph,
    Sentence,
}

impl Granularity {
    /// The next finer level, or `None` below sentences.
    pub fn finer(self) -> Option<Self> {
        match self {
            Granularity::Section => Some(Granularity::Paragraph),
            Granularity::Paragraph => Some(Granularity::Sentence),
            Granularity::Sentence => None,
        }
    }

    /// Split `text` into units of this granularity.
    pub fn split(self, text: &str) -> Vec<&str> {
        match self {
            Granularity::Section => split_sections(text),
            Granularity::Paragraph => split_paragraphs(text),
            Granularity::Sentence => split_sentences(text),
        }
    }

    /// Separator to insert before `unit` when appending it to text that
    /// already holds units of this granularity.
    pub fn separator_before(self, unit: &str) -> &'static str {
        match self {
            // Section units keep the line break(s) that preceded the next
            // heading, so a heading is appended as-is.
            Granularity::Section if starts_with_heading(unit) => "",
            Granularity::Section | Granularity::Paragraph => "\n\n",
            Granularity::Sentence => " ",
        }
    }
}

/// `true` when `text` opens with a heading marker (`#`, `##`, … then a space).
pub fn starts_with_heading(text: &str) -> bool {
    RE_HEADING_PREFIX.is_match(text)
}

/// Split before every line that starts with a heading marker.
///
/// Text before the first heading is its own leading unit. Units partition
/// the input exactly: concatenating them gives the input back.
pub fn split_sections(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    for m in RE_HEADING_LINE.find_iter(text) {
        if m.start() > start {
            units.push(&text[start..m.start()]);
            start = m.start();
        }
    }
    units.push(&text[start..]);
    units
}

/// Split on one or more blank lines. The blank lines are dropped.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    RE_BLANK_LINES.split(text).collect()
}

/// Split after `.`, `!` or `?` when followed by whitespace.
///
/// The punctuation stays with its sentence; the whitespace run is dropped.
/// Heuristic only: abbreviations such as "e.g. " also count as boundaries.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    for m in RE_SENTENCE_END.find_iter(text) {
        // Terminal punctuation is a single ASCII byte.
        let end = m.start() + 1;
        fragments.push(&text[start..end]);
        start = m.end();
    }
    if start < text.len() || fragments.is_empty() {
        fragments.push(&text[start..]);
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_keep_heading_prefix() {
        let text = "# One\nalpha\n\n## Two\nbeta\n";
        let units = split_sections(text);
        assert_eq!(units, vec!["# One\nalpha\n\n", "## Two\nbeta\n"]);
    }

    #[test]
    fn sections_preamble_is_leading_unit() {
        let text = "intro text\n\n# Heading\nbody";
        let units = split_sections(text);
        assert_eq!(units, vec!["intro text\n\n", "# Heading\nbody"]);
        assert_eq!(units.concat(), text);
    }

    #[test]
    fn sections_ignore_hash_without_space() {
        let text = "#hashtag is not a heading\n#### but this is";
        let units = split_sections(text);
        assert_eq!(units, vec!["#hashtag is not a heading\n", "#### but this is"]);
    }

    #[test]
    fn sections_ignore_mid_line_hash() {
        let text = "see issue # 42 for details";
        assert_eq!(split_sections(text), vec![text]);
    }

    #[test]
    fn sections_of_empty_text() {
        assert_eq!(split_sections(""), vec![""]);
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let text = "first\nstill first\n\nsecond\n\n\n\nthird";
        assert_eq!(
            split_paragraphs(text),
            vec!["first\nstill first", "second", "third"]
        );
    }

    #[test]
    fn paragraphs_treat_whitespace_lines_as_blank() {
        let text = "first\n  \t\nsecond";
        assert_eq!(split_paragraphs(text), vec!["first", "second"]);
    }

    #[test]
    fn paragraphs_without_boundary() {
        assert_eq!(split_paragraphs("one line\nanother"), vec!["one line\nanother"]);
    }

    #[test]
    fn sentences_keep_punctuation() {
        let text = "First one. Second one! Third one? Tail";
        assert_eq!(
            split_sentences(text),
            vec!["First one.", "Second one!", "Third one?", "Tail"]
        );
    }

    #[test]
    fn sentences_trailing_boundary_adds_no_empty_fragment() {
        assert_eq!(split_sentences("Done. \n"), vec!["Done."]);
    }

    #[test]
    fn sentences_without_boundary() {
        let text = "no terminal punctuation here at all";
        assert_eq!(split_sentences(text), vec![text]);
        assert_eq!(split_sentences("3.14 is pi"), vec!["3.14 is pi"]);
    }

    #[test]
    fn granularity_descends_to_sentence() {
        assert_eq!(Granularity::Section.finer(), Some(Granularity::Paragraph));
        assert_eq!(Granularity::Paragraph.finer(), Some(Granularity::Sentence));
        assert_eq!(Granularity::Sentence.finer(), None);
    }

    #[test]
    fn separators_per_level() {
        assert_eq!(Granularity::Section.separator_before("## Next"), "");
        assert_eq!(Granularity::Section.separator_before("plain"), "\n\n");
        assert_eq!(Granularity::Paragraph.separator_before("# Heading"), "\n\n");
        assert_eq!(Granularity::Sentence.separator_before("Next."), " ");
    }
}
