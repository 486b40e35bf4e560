//! Post-processing: deterministic cleanup of LLM-rewritten Markdown.
//!
//! Even with a strict prompt, chat models wrap answers in ` ```markdown `
//! fences, emit CRLF line endings, leave trailing spaces, or glue a heading
//! to the previous paragraph. Each rule below is a pure `&str → String`
//! pass; they run per chunk, before the chunks are joined.
//!
//! Order matters: fences are stripped before line endings are normalised so
//! the fence regex sees the raw answer, and heading spacing runs after blank
//! lines are collapsed so it does not re-introduce long gaps.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to one rewritten chunk.
///
/// 1. Strip an outer ```` ```markdown ```` fence
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of blank lines to a single blank line
/// 5. Ensure a blank line before each heading (outside code fences)
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. End with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = space_headings(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Rule 1 ───────────────────────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rules 2–4 ────────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}

// ── Rule 5 ───────────────────────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6} ").unwrap());

fn space_headings(input: &str) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(input.len() / 32 + 1);
    let mut in_fence = false;
    for line in input.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let needs_gap = !in_fence
            && RE_HEADING.is_match(line)
            && out.last().is_some_and(|prev| !prev.is_empty());
        if needs_gap {
            out.push("");
        }
        out.push(line);
    }
    out.join("\n")
}

// ── Rules 6–7 ────────────────────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'], "")
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}
