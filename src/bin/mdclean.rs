//! CLI binary for edgequake-mdclean.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `CleanupConfig`, runs a batch, and prints a summary.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_mdclean::batch::collect_inputs;
use edgequake_mdclean::pipeline::extract::InputKind;
use edgequake_mdclean::{
    clean_path, count_path, extract_path, BatchOptions, BatchReport, Cleaner, CleanupConfig,
    CleanupProgressCallback, PageSeparator, ProgressCallback, TiktokenCounter,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over the chunks of the document currently being cleaned.
/// Reset at every `on_document_start`, so one bar serves a whole batch.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Cleaning");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl CleanupProgressCallback for CliProgressCallback {
    fn on_document_start(&self, total_chunks: usize, total_tokens: usize) {
        self.bar.reset();
        self.bar.set_length(total_chunks as u64);
        self.bar.set_message(format!("{total_tokens} tokens"));
    }

    fn on_chunk_complete(&self, _chunk_num: usize, _total: usize, _markdown_len: usize) {
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, chunk_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}",
            red("✗"),
            chunk_num,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Clean every Markdown/PDF file in a directory
  mdclean clean -i docs/ -o cleaned/

  # Walk subdirectories, smaller chunks, a different model
  mdclean clean -i docs/ -o cleaned/ --recursive --max-chunk-tokens 4000 --model gpt-4.1-mini

  # Show how a document would be chunked, without calling the LLM
  mdclean clean -i big.md -o out/ --plan-only --json

  # PDF → sanitised Markdown only (no LLM, no API key)
  mdclean extract -i pdfs/ -o markdown/

  # Token report for a directory of Markdown files
  mdclean count -i markdown/

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  OPENAI_MODEL            Model ID (default gpt-4.1-nano)
  OPENAI_TEMPERATURE      Sampling temperature (default 0.1)
  OPENAI_MAX_TOKENS       Completion cap per chunk
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Model used with EDGEQUAKE_LLM_PROVIDER
  PDFIUM_LIB_PATH         Path to libpdfium (skips the first-run download)
"#;

/// Clean up Markdown and PDF documents with an LLM, in token-bounded chunks.
#[derive(Parser, Debug)]
#[command(
    name = "mdclean",
    version,
    about = "Clean up Markdown and PDF documents with an LLM, in token-bounded chunks",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MDCLEAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MDCLEAN_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite Markdown/PDF files into cleaned Markdown.
    Clean(CleanArgs),
    /// Extract PDF text to sanitised Markdown without an LLM.
    Extract(ExtractArgs),
    /// Print token counts of Markdown files.
    Count(CountArgs),
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Input file or directory.
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory.
    #[arg(short, long)]
    output: PathBuf,

    /// Descend into subdirectories.
    #[arg(short, long, env = "MDCLEAN_RECURSIVE")]
    recursive: bool,

    /// LLM model ID.
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "MDCLEAN_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "OPENAI_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per chunk.
    #[arg(long, env = "OPENAI_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Token budget per chunk.
    #[arg(long, env = "MDCLEAN_MAX_CHUNK_TOKENS", default_value_t = 8000)]
    max_chunk_tokens: usize,

    /// Model whose tokenizer measures chunks.
    #[arg(long, env = "MDCLEAN_TOKENIZER_MODEL", default_value = "gpt-4")]
    tokenizer_model: String,

    /// Number of concurrent LLM calls per document.
    #[arg(short, long, env = "MDCLEAN_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Retries per chunk on LLM failure.
    #[arg(long, env = "MDCLEAN_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-chunk LLM call timeout in seconds.
    #[arg(long, env = "MDCLEAN_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "MDCLEAN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Skip deterministic post-processing of rewritten chunks.
    #[arg(long)]
    no_postprocess: bool,

    #[command(flatten)]
    pdf: PdfArgs,

    /// Chunk and report only; no LLM calls, nothing written.
    #[arg(long)]
    plan_only: bool,

    /// Print the batch report as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MDCLEAN_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Input PDF file or directory.
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory.
    #[arg(short, long)]
    output: PathBuf,

    /// Descend into subdirectories.
    #[arg(short, long)]
    recursive: bool,

    #[command(flatten)]
    pdf: PdfArgs,

    /// Print the batch report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CountArgs {
    /// Input Markdown file or directory.
    #[arg(short, long)]
    input: PathBuf,

    /// Descend into subdirectories.
    #[arg(short, long)]
    recursive: bool,

    /// Model whose tokenizer counts.
    #[arg(long, env = "MDCLEAN_TOKENIZER_MODEL", default_value = "gpt-4")]
    tokenizer_model: String,

    /// Print the tally as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PdfArgs {
    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "MDCLEAN_SEPARATOR", default_value = "none")]
    separator: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "MDCLEAN_PASSWORD")]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = match &cli.command {
        Command::Clean(a) => !cli.quiet && !a.no_progress && !a.json && !a.plan_only,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Returns `Ok(false)` when at least one file failed.
async fn run(cli: Cli) -> Result<bool> {
    let quiet = cli.quiet;
    match cli.command {
        Command::Clean(args) => run_clean(args, quiet).await,
        Command::Extract(args) => run_extract(args, quiet).await,
        Command::Count(args) => run_count(args).await,
    }
}

async fn run_clean(args: CleanArgs, quiet: bool) -> Result<bool> {
    let show_progress = !quiet && !args.no_progress && !args.json && !args.plan_only;
    let progress = show_progress.then(CliProgressCallback::new);
    let callback = progress
        .clone()
        .map(|cb| cb as Arc<dyn CleanupProgressCallback>);

    ensure_pdf_engine(&args.input, args.recursive, quiet)?;

    let config = build_config(&args, callback).await?;
    let cleaner = if args.plan_only {
        // No provider needed to chunk.
        let counter = TiktokenCounter::for_model(&config.tokenizer_model)
            .context("Failed to load tokenizer")?;
        let unused = |_: &str| -> Result<String, edgequake_mdclean::MdCleanError> {
            Err(edgequake_mdclean::MdCleanError::Internal(
                "rewrite called in plan-only mode".into(),
            ))
        };
        Cleaner::new(Arc::new(counter), Arc::new(unused), config)
    } else {
        Cleaner::from_config(config).context("Failed to initialise cleanup pipeline")?
    };

    let options = BatchOptions {
        recursive: args.recursive,
        plan_only: args.plan_only,
    };
    let report = clean_path(&cleaner, &args.input, &args.output, options)
        .await
        .context("Cleanup failed")?;

    if let Some(cb) = progress {
        cb.finish();
    }
    print_report(&report, args.json, quiet)?;
    Ok(report.is_success())
}

async fn run_extract(args: ExtractArgs, quiet: bool) -> Result<bool> {
    ensure_pdf_engine(&args.input, args.recursive, quiet)?;

    let mut builder =
        CleanupConfig::builder().page_separator(PageSeparator::parse(&args.pdf.separator));
    if let Some(ref password) = args.pdf.password {
        builder = builder.password(password.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    let report = extract_path(&args.input, &args.output, args.recursive, &config)
        .await
        .context("Extraction failed")?;
    print_report(&report, args.json, quiet)?;
    Ok(report.is_success())
}

/// Make sure the pdfium library is on disk before any PDF is opened.
///
/// On the first run the library (~30 MB) is downloaded to the user cache;
/// later runs only check the path. Markdown-only inputs skip this entirely.
fn ensure_pdf_engine(input: &Path, recursive: bool, quiet: bool) -> Result<()> {
    let has_pdf = collect_inputs(input, recursive, &[InputKind::Pdf])
        .map(|files| !files.is_empty())
        .unwrap_or(false);
    if !has_pdf || pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }

    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready");
    Ok(())
}

async fn run_count(args: CountArgs) -> Result<bool> {
    let counter =
        TiktokenCounter::for_model(&args.tokenizer_model).context("Failed to load tokenizer")?;
    let tally = count_path(&counter, &args.input, args.recursive)
        .await
        .context("Token count failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&tally).context("Failed to serialise tally")?
        );
    } else {
        for f in &tally.files {
            println!("{:>10}  {}", f.tokens, f.path.display());
        }
        for f in &tally.failed {
            println!("{:>10}  {}  {}", red("error"), f.input.display(), dim(&f.error));
        }
        println!("{:>10}  {}", bold(&tally.total.to_string()), bold("total"));
    }
    Ok(tally.failed.is_empty())
}

fn print_report(report: &BatchReport, json: bool, quiet: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialise report")?
        );
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    for ok in &report.succeeded {
        match (&ok.output, &ok.plan) {
            (_, Some(plan)) => {
                eprintln!(
                    "{} {}  {} tokens → {} chunk(s)",
                    green("◆"),
                    ok.input.display(),
                    plan.document_tokens,
                    plan.chunks.len()
                );
                for c in &plan.chunks {
                    eprintln!(
                        "    {:>3}. {:>7} tokens  {:?}{}",
                        c.chunk_num,
                        c.tokens,
                        c.granularity,
                        if c.oversized { red("  oversized") } else { String::new() }
                    );
                }
            }
            (Some(out), None) => eprintln!(
                "  {} {}  →  {}  {}",
                green("✓"),
                ok.input.display(),
                bold(&out.display().to_string()),
                dim(&format!("{} chunk(s)", ok.chunks)),
            ),
            (None, None) => {}
        }
    }
    for failed in &report.failed {
        eprintln!("  {} {}  {}", red("✗"), failed.input.display(), red(&failed.error));
    }

    let total = report.total();
    if report.is_success() {
        eprintln!("{} {} file(s) processed", green("✔"), bold(&total.to_string()));
    } else {
        eprintln!(
            "{} {}/{} file(s) processed  ({} failed)",
            red("✘"),
            report.succeeded.len(),
            total,
            report.failed.len()
        );
    }
    Ok(())
}

/// Map CLI args to `CleanupConfig`.
async fn build_config(args: &CleanArgs, progress: Option<ProgressCallback>) -> Result<CleanupConfig> {
    let mut builder = CleanupConfig::builder()
        .temperature(args.temperature)
        .max_output_tokens(args.max_tokens)
        .max_chunk_tokens(args.max_chunk_tokens)
        .tokenizer_model(args.tokenizer_model.clone())
        .concurrency(args.concurrency)
        .max_retries(args.max_retries)
        .api_timeout_secs(args.api_timeout)
        .postprocess(!args.no_postprocess)
        .page_separator(PageSeparator::parse(&args.pdf.separator));

    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = args.pdf.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
