//! Sanitisation of extracted text before it is chunked.
//!
//! PDF text layers carry characters that confuse both the tokenizer and the
//! rewrite model: typographic ellipses, non-breaking spaces, long runs of
//! table-of-contents leader dots, control bytes, zero-width marks and
//! astral-plane glyphs from symbol fonts. Newlines and tabs are kept since
//! every structural split depends on them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every sanitisation rule, in order:
///
/// 1. CRLF / CR → LF
/// 2. `…` → `...`
/// 3. NBSP → space
/// 4. Runs of 4+ dots (leaders such as `Chapter 1 ........ 5`) → ` ... `
/// 5. Drop control characters except `\n` and `\t`, zero-width marks,
///    BOM, soft hyphen, bidi marks and overrides, U+2028/U+2029,
///    private-use and noncharacter code points, and anything outside the
///    Basic Multilingual Plane
pub fn sanitize(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = s.replace('\u{2026}', "...").replace('\u{00A0}', " ");
    let s = collapse_leader_dots(&s);
    strip_unprintable(&s)
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

static RE_LEADER_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]*\.{4,}[ \t]*").unwrap());

fn collapse_leader_dots(input: &str) -> String {
    RE_LEADER_DOTS.replace_all(input, " ... ").into_owned()
}

const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}',
];

/// Line/paragraph separators and bidi marks, embeddings and overrides.
fn is_format_mark(c: char) -> bool {
    matches!(c, '\u{200E}' | '\u{200F}' | '\u{2028}' | '\u{2029}' | '\u{202A}'..='\u{202E}')
}

fn is_private_or_nonchar(c: char) -> bool {
    let cp = c as u32;
    (0xE000..=0xF8FF).contains(&cp) || (0xFDD0..=0xFDEF).contains(&cp) || cp & 0xFFFE == 0xFFFE
}

fn is_kept(c: char) -> bool {
    if c == '\n' || c == '\t' {
        return true;
    }
    !c.is_control()
        && !INVISIBLE.contains(&c)
        && !is_format_mark(c)
        && !is_private_or_nonchar(c)
        && (c as u32) < 0x1_0000
}

fn strip_unprintable(input: &str) -> String {
    input.chars().filter(|&c| is_kept(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipsis_and_nbsp() {
        assert_eq!(sanitize("wait\u{2026}\u{00A0}go"), "wait... go");
    }

    #[test]
    fn leader_dots_collapse() {
        assert_eq!(sanitize("Intro ........ 5"), "Intro ... 5");
        // A plain ellipsis is left alone.
        assert_eq!(sanitize("and so on..."), "and so on...");
    }

    #[test]
    fn control_characters_removed_but_structure_kept() {
        let input = "# Title\r\n\r\nbody\u{0007} text\twith tab\u{000C}\n";
        assert_eq!(sanitize(input), "# Title\n\nbody text\twith tab\n");
    }

    #[test]
    fn invisible_and_astral_removed() {
        let input = "a\u{200B}b\u{FEFF}c\u{00AD}d \u{1F600} e";
        assert_eq!(sanitize(input), "abcd  e");

        let input = "a\u{E000}b\u{2028}c\u{2009}d\u{FFFE}e\u{FFFF}f\u{FDD0}g";
        assert_eq!(sanitize(input), "abc\u{2009}defg");
    }

    #[test]
    fn bidi_marks_removed_but_tabs_and_newlines_kept() {
        let input = "x\u{200E}y\u{200F}z\u{202A}1\u{202E}2\u{2029}\tend\n";
        assert_eq!(sanitize(input), "xyz12\tend\n");
    }

    #[test]
    fn accented_text_untouched() {
        let input = "Überschrift: Größe und Maße — 10 €";
        assert_eq!(sanitize(input), input);
    }
}
