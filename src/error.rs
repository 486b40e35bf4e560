//! Error types for the edgequake-mdclean library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MdCleanError`] — **Fatal** for one document: the file cannot be read,
//!   the tokenizer cannot be loaded, the provider is not configured, or a
//!   chunk could not be rewritten. Returned as `Err(MdCleanError)` from the
//!   top-level `clean*` / `extract*` functions.
//!
//! * [`ChunkError`] — the recorded failure of a single chunk after its
//!   retries ran out. Stored inside [`crate::output::ChunkResult`]. A
//!   document is all-or-nothing: the first failed chunk is promoted to
//!   [`MdCleanError::ChunkFailed`] and no output is written for it.
//!
//! Batch runs sit one level above: one document's `MdCleanError` is logged
//! and collected into [`crate::batch::BatchReport`] while the batch continues.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-mdclean library.
#[derive(Debug, Error)]
pub enum MdCleanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading an input.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is neither Markdown nor PDF.
    #[error("Unsupported input '{path}': expected a .md, .markdown or .pdf file")]
    UnsupportedInput { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium could not return the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or check network access for the first-run download.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Tokenizer errors ──────────────────────────────────────────────────
    /// No tiktoken vocabulary is known for the configured model.
    #[error("Tokenizer for model '{model}' is unavailable: {detail}")]
    TokenizerUnavailable { model: String, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM answered with no content.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// A chunk could not be rewritten; the whole document is abandoned.
    #[error("Chunk {chunk}/{total} failed, document not written: {source}")]
    ChunkFailed {
        chunk: usize,
        total: usize,
        #[source]
        source: ChunkError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two inputs of one batch map to the same output file.
    #[error("Output '{path}' is already written for '{earlier}'\nRename one of the inputs.")]
    OutputCollision { path: PathBuf, earlier: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MdCleanError {
    /// Map an I/O error from reading `path` onto the matching input variant.
    pub(crate) fn from_read(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => MdCleanError::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => MdCleanError::PermissionDenied { path },
            _ => MdCleanError::ReadFailed { path, source: err },
        }
    }
}

/// Failure of a single chunk, recorded after retries are exhausted.
///
/// Chunk numbers are 1-indexed to match log output.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// Every rewrite attempt returned an error.
    #[error("Chunk {chunk}: rewrite failed after {retries} retries: {detail}")]
    RewriteFailed {
        chunk: usize,
        retries: u32,
        detail: String,
    },

    /// The last attempt hit the per-call timeout.
    #[error("Chunk {chunk}: rewrite timed out after {secs}s")]
    Timeout { chunk: usize, secs: u64 },
}
