//! File and directory processing on top of [`Cleaner`].
//!
//! An input is either one file or a directory (optionally walked
//! recursively). Each file is processed on its own: a failure is logged,
//! recorded in the [`BatchReport`], and the batch moves on. Within a file
//! the usual all-or-nothing rule holds, and outputs are written atomically
//! (temp file + rename) so a crash never leaves a half-written `.md`.

use crate::clean::Cleaner;
use crate::config::CleanupConfig;
use crate::error::MdCleanError;
use crate::output::ChunkPlan;
use crate::pipeline::extract::{extract_markdown, load_document, InputKind};
use crate::tokens::TokenCounter;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Knobs for [`clean_path`] and [`extract_path`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Chunk only; report the plan and write nothing.
    pub plan_only: bool,
}

/// Per-file outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<FileOutcome>,
    pub failed: Vec<FileFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    /// `None` in plan-only mode.
    pub output: Option<PathBuf>,
    pub document_tokens: usize,
    pub chunks: usize,
    pub plan: Option<ChunkPlan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub input: PathBuf,
    pub error: String,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    fn fail(&mut self, input: &Path, err: &MdCleanError) {
        warn!("Failed to process {}: {}", input.display(), err);
        self.failed.push(FileFailure {
            input: input.to_path_buf(),
            error: err.to_string(),
        });
    }
}

/// Token counts for a set of Markdown files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenTally {
    /// Sorted by path.
    pub files: Vec<FileTokens>,
    pub failed: Vec<FileFailure>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileTokens {
    pub path: PathBuf,
    pub tokens: usize,
}

/// List the files under `input` whose kind is in `kinds`, sorted by path.
///
/// A file given directly must itself match, otherwise
/// [`MdCleanError::UnsupportedInput`].
pub fn collect_inputs(
    input: &Path,
    recursive: bool,
    kinds: &[InputKind],
) -> Result<Vec<PathBuf>, MdCleanError> {
    let accepted = |p: &Path| InputKind::from_path(p).is_some_and(|k| kinds.contains(&k));

    if !input.exists() {
        return Err(MdCleanError::FileNotFound {
            path: input.to_path_buf(),
        });
    }
    if input.is_file() {
        if accepted(input) {
            return Ok(vec![input.to_path_buf()]);
        }
        return Err(MdCleanError::UnsupportedInput {
            path: input.to_path_buf(),
        });
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(input)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(input).to_path_buf();
            MdCleanError::from_read(path, std::io::Error::from(e))
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && accepted(path) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Where the Markdown for `file` goes: mirrored under `out_dir` relative to
/// `input_root`, with a `.md` extension.
pub fn output_path(input_root: &Path, file: &Path, out_dir: &Path) -> PathBuf {
    let relative = if input_root.is_dir() {
        file.strip_prefix(input_root).unwrap_or(file)
    } else {
        file.file_name().map(Path::new).unwrap_or(file)
    };
    out_dir.join(relative).with_extension("md")
}

/// Output targets handed out so far in one batch, keyed to the input that
/// owns each. `notes.md` and `notes.markdown` both map to `notes.md`; the
/// first in walk order wins.
#[derive(Debug, Default)]
struct ClaimedTargets(HashMap<PathBuf, PathBuf>);

impl ClaimedTargets {
    fn claim(&mut self, target: &Path, input: &Path) -> Result<(), MdCleanError> {
        match self.0.get(target) {
            Some(earlier) => Err(MdCleanError::OutputCollision {
                path: target.to_path_buf(),
                earlier: earlier.clone(),
            }),
            None => {
                self.0.insert(target.to_path_buf(), input.to_path_buf());
                Ok(())
            }
        }
    }
}

/// Write `contents` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), MdCleanError> {
    let write_err = |e| MdCleanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

/// Clean every Markdown or PDF file under `input` into `out_dir`.
///
/// # Errors
/// Only when `input` itself cannot be listed; per-file failures land in
/// [`BatchReport::failed`].
pub async fn clean_path(
    cleaner: &Cleaner,
    input: &Path,
    out_dir: &Path,
    options: BatchOptions,
) -> Result<BatchReport, MdCleanError> {
    let files = collect_inputs(
        input,
        options.recursive,
        &[InputKind::Markdown, InputKind::Pdf],
    )?;
    info!("Found {} file(s) under {}", files.len(), input.display());

    let mut report = BatchReport::default();
    let mut claimed = ClaimedTargets::default();
    for file in files {
        let target = output_path(input, &file, out_dir);
        if !options.plan_only {
            if let Err(e) = claimed.claim(&target, &file) {
                report.fail(&file, &e);
                continue;
            }
        }

        let document = match load_document(&file, cleaner.config()).await {
            Ok(doc) => doc,
            Err(e) => {
                report.fail(&file, &e);
                continue;
            }
        };

        if options.plan_only {
            let plan = cleaner.plan(&document);
            report.succeeded.push(FileOutcome {
                input: file,
                output: None,
                document_tokens: plan.document_tokens,
                chunks: plan.chunks.len(),
                plan: Some(plan),
            });
            continue;
        }

        let result = match cleaner.clean(&document).await {
            Ok(out) => write_atomic(&target, &out.markdown).await.map(|_| out),
            Err(e) => Err(e),
        };
        match result {
            Ok(out) => {
                info!("Wrote {}", target.display());
                report.succeeded.push(FileOutcome {
                    input: file,
                    output: Some(target),
                    document_tokens: out.stats.document_tokens,
                    chunks: out.stats.chunk_count,
                    plan: None,
                });
            }
            Err(e) => report.fail(&file, &e),
        }
    }

    info!(
        "Batch complete: {}/{} succeeded",
        report.succeeded.len(),
        report.total()
    );
    Ok(report)
}

/// Extract every PDF under `input` to sanitised Markdown in `out_dir`.
///
/// No LLM is involved. Token fields of the outcomes are left at zero.
pub async fn extract_path(
    input: &Path,
    out_dir: &Path,
    recursive: bool,
    config: &CleanupConfig,
) -> Result<BatchReport, MdCleanError> {
    let files = collect_inputs(input, recursive, &[InputKind::Pdf])?;
    info!("Found {} PDF(s) under {}", files.len(), input.display());

    let mut report = BatchReport::default();
    let mut claimed = ClaimedTargets::default();
    for file in files {
        let target = output_path(input, &file, out_dir);
        if let Err(e) = claimed.claim(&target, &file) {
            report.fail(&file, &e);
            continue;
        }
        let result = match extract_markdown(&file, config).await {
            Ok(text) => write_atomic(&target, &text).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => report.succeeded.push(FileOutcome {
                input: file,
                output: Some(target),
                document_tokens: 0,
                chunks: 0,
                plan: None,
            }),
            Err(e) => report.fail(&file, &e),
        }
    }
    Ok(report)
}

/// Count tokens of every Markdown file under `input`.
pub async fn count_path(
    counter: &dyn TokenCounter,
    input: &Path,
    recursive: bool,
) -> Result<TokenTally, MdCleanError> {
    let files = collect_inputs(input, recursive, &[InputKind::Markdown])?;

    let mut tally = TokenTally::default();
    for path in files {
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let tokens = counter.count(&text);
                tally.total += tokens;
                tally.files.push(FileTokens { path, tokens });
            }
            Err(e) => {
                let err = MdCleanError::from_read(&path, e);
                warn!("Skipping {}: {}", path.display(), err);
                tally.failed.push(FileFailure {
                    input: path,
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_mirrors_directory_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let file = root.join("sub").join("report.pdf");
        assert_eq!(
            output_path(root, &file, Path::new("/out")),
            PathBuf::from("/out/sub/report.md")
        );
    }

    #[test]
    fn output_path_for_single_file() {
        let file = Path::new("/data/notes.markdown");
        assert_eq!(
            output_path(file, file, Path::new("out")),
            PathBuf::from("out/notes.md")
        );
    }

    #[test]
    fn collect_respects_recursion_and_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("b.md"), "b").unwrap();
        std::fs::write(root.join("a.pdf"), "%PDF").unwrap();
        std::fs::write(root.join("skip.txt"), "x").unwrap();
        std::fs::create_dir(root.join("nested")).unwrap();
        std::fs::write(root.join("nested").join("c.md"), "c").unwrap();

        let flat = collect_inputs(root, false, &[InputKind::Markdown, InputKind::Pdf]).unwrap();
        assert_eq!(flat, vec![root.join("a.pdf"), root.join("b.md")]);

        let deep = collect_inputs(root, true, &[InputKind::Markdown]).unwrap();
        assert_eq!(deep, vec![root.join("b.md"), root.join("nested").join("c.md")]);
    }

    #[test]
    fn collect_rejects_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            collect_inputs(&file, false, &[InputKind::Markdown]),
            Err(MdCleanError::UnsupportedInput { .. })
        ));
        assert!(matches!(
            collect_inputs(&dir.path().join("missing"), false, &[InputKind::Markdown]),
            Err(MdCleanError::FileNotFound { .. })
        ));
    }

    #[test]
    fn second_claim_on_a_target_names_the_first_input() {
        let mut claimed = ClaimedTargets::default();
        let target = Path::new("out/notes.md");
        claimed.claim(target, Path::new("in/notes.markdown")).unwrap();
        match claimed.claim(target, Path::new("in/notes.md")) {
            Err(MdCleanError::OutputCollision { path, earlier }) => {
                assert_eq!(path, target);
                assert_eq!(earlier, PathBuf::from("in/notes.markdown"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(claimed.claim(Path::new("out/other.md"), Path::new("in/other.md")).is_ok());
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("deep").join("out.md");
        write_atomic(&target, "# Done\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "# Done\n");
        assert!(!target.with_extension("md.tmp").exists());
    }
}
