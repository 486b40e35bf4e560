//! Input loading: Markdown files are read as-is, PDFs go through pdfium's
//! text layer. Either way the result is sanitised before it reaches the
//! chunker.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while parsing. All pdfium work runs on the blocking pool
//! so Tokio worker threads keep serving the rewrite calls of other files.

use crate::config::{CleanupConfig, PageSeparator};
use crate::error::MdCleanError;
use crate::pipeline::sanitize::sanitize;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Input formats the pipeline accepts, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Markdown,
    Pdf,
}

impl InputKind {
    /// `None` for anything that is not `.md`, `.markdown` or `.pdf`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(InputKind::Markdown),
            "pdf" => Some(InputKind::Pdf),
            _ => None,
        }
    }
}

/// Load `path` as sanitised Markdown text, extracting it first if it is a PDF.
pub async fn load_document(path: &Path, config: &CleanupConfig) -> Result<String, MdCleanError> {
    match InputKind::from_path(path) {
        Some(InputKind::Markdown) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| MdCleanError::from_read(path, e))?;
            Ok(sanitize(&raw))
        }
        Some(InputKind::Pdf) => extract_markdown(path, config).await,
        None => Err(MdCleanError::UnsupportedInput {
            path: path.to_path_buf(),
        }),
    }
}

/// Extract the text layer of a PDF, one block per page, and sanitise it.
///
/// Pages are joined with [`PageSeparator::render`]. Pages without a text
/// layer (scans) contribute nothing and are logged at `warn`.
pub async fn extract_markdown(
    pdf_path: &Path,
    config: &CleanupConfig,
) -> Result<String, MdCleanError> {
    let path = pdf_path.to_path_buf();
    let password = config.password.clone();
    let separator = config.page_separator.clone();

    let text = tokio::task::spawn_blocking(move || {
        check_magic(&path)?;
        extract_blocking(&path, password.as_deref(), &separator)
    })
    .await
    .map_err(|e| MdCleanError::Internal(format!("Extraction task panicked: {}", e)))??;

    Ok(sanitize(&text))
}

/// Reject files that do not start with `%PDF` before pdfium sees them.
fn check_magic(path: &Path) -> Result<(), MdCleanError> {
    let mut f = std::fs::File::open(path).map_err(|e| MdCleanError::from_read(path, e))?;
    let mut magic = [0u8; 4];
    let n = f
        .read(&mut magic)
        .map_err(|e| MdCleanError::from_read(path, e))?;
    if n < 4 || &magic != b"%PDF" {
        return Err(MdCleanError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Bind pdfium through `pdfium-auto`: `PDFIUM_LIB_PATH` if it exists,
/// otherwise the cached copy, downloading it on first use.
fn bind_pdfium() -> Result<Pdfium, MdCleanError> {
    pdfium_auto::bind_pdfium_silent().map_err(binding_error)
}

fn binding_error(e: pdfium_auto::PdfiumAutoError) -> MdCleanError {
    MdCleanError::PdfiumBindingFailed(e.to_string())
}

fn extract_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    separator: &PageSeparator,
) -> Result<String, MdCleanError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                MdCleanError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                MdCleanError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            MdCleanError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut out = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let text = page
            .text()
            .map_err(|e| MdCleanError::TextExtractionFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?
            .all();

        if text.trim().is_empty() {
            warn!("Page {} has no text layer", page_num);
            continue;
        }
        if !out.is_empty() {
            out.push_str(&separator.render(page_num));
        }
        out.push_str(text.trim_end());
        debug!("Page {}: {} chars", page_num, text.len());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn input_kind_by_extension() {
        assert_eq!(InputKind::from_path(Path::new("a.md")), Some(InputKind::Markdown));
        assert_eq!(InputKind::from_path(Path::new("b.MARKDOWN")), Some(InputKind::Markdown));
        assert_eq!(InputKind::from_path(Path::new("c.Pdf")), Some(InputKind::Pdf));
        assert_eq!(InputKind::from_path(Path::new("d.txt")), None);
        assert_eq!(InputKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn magic_check_rejects_non_pdf() {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(b"GIF89a not a pdf").unwrap();
        match check_magic(f.path()) {
            Err(MdCleanError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"GIF8"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn magic_check_rejects_short_file() {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(matches!(check_magic(f.path()), Err(MdCleanError::NotAPdf { .. })));
    }

    #[test]
    fn binding_failure_keeps_download_detail() {
        let err = binding_error(pdfium_auto::PdfiumAutoError::Download(
            "HTTP 404 for pdfium-linux-x64.tgz".into(),
        ));
        match err {
            MdCleanError::PdfiumBindingFailed(detail) => {
                assert!(detail.contains("Download failed"), "{detail}");
                assert!(detail.contains("HTTP 404"), "{detail}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_pdf_is_file_not_found() {
        let err = extract_markdown(Path::new("/nonexistent/x.pdf"), &CleanupConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MdCleanError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn markdown_input_is_sanitised() {
        let mut f = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        f.write_all("# Title\r\n\r\nwait\u{2026}\u{200B}\n".as_bytes())
            .unwrap();
        let text = load_document(f.path(), &CleanupConfig::default())
            .await
            .unwrap();
        assert_eq!(text, "# Title\n\nwait...\n");
    }

    #[tokio::test]
    async fn unsupported_extension_rejected() {
        let err = load_document(Path::new("notes.txt"), &CleanupConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MdCleanError::UnsupportedInput { .. }));
    }
}
