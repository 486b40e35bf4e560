//! Configuration for extraction, chunking and LLM cleanup.
//!
//! All behaviour is controlled through [`CleanupConfig`], built via its
//! [`CleanupConfigBuilder`]. Nothing in the library reads API settings from
//! the environment except provider auto-detection in
//! [`crate::pipeline::rewrite::resolve_provider`]; the CLI maps its flags and
//! env vars onto this struct.

use crate::error::MdCleanError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Configuration for one cleanup run.
///
/// # Example
/// ```rust
/// use edgequake_mdclean::CleanupConfig;
///
/// let config = CleanupConfig::builder()
///     .max_chunk_tokens(6000)
///     .concurrency(2)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CleanupConfig {
    /// LLM model identifier. If None, [`DEFAULT_MODEL`] or the environment.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the rewrite call. Default: 0.1.
    ///
    /// The rewrite must not invent content, so this stays close to 0.
    pub temperature: f32,

    /// Completion cap per chunk. Default: None (provider default).
    pub max_output_tokens: Option<usize>,

    /// Token budget per chunk sent to the LLM. Default: 8000.
    ///
    /// Leaves room in a 16k+ context for the system prompt and a rewritten
    /// answer of similar length.
    pub max_chunk_tokens: usize,

    /// Model whose tiktoken vocabulary measures chunk size. Default: "gpt-4".
    pub tokenizer_model: String,

    /// Number of rewrite calls in flight at once. Default: 4.
    pub concurrency: usize,

    /// Retries per chunk after a failed rewrite call. Default: 3.
    ///
    /// A retry resends the same chunk text; nothing accumulates between
    /// attempts.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Run [`crate::pipeline::postprocess::clean_markdown`] on each rewritten
    /// chunk. Default: true.
    pub postprocess: bool,

    /// Separator between pages of an extracted PDF. Default: blank line.
    pub page_separator: PageSeparator,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-chunk progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_output_tokens: None,
            max_chunk_tokens: 8000,
            tokenizer_model: "gpt-4".to_string(),
            concurrency: 4,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            system_prompt: None,
            postprocess: true,
            page_separator: PageSeparator::default(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CleanupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_chunk_tokens", &self.max_chunk_tokens)
            .field("tokenizer_model", &self.tokenizer_model)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "<custom>"))
            .field("postprocess", &self.postprocess)
            .field("page_separator", &self.page_separator)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn CleanupProgressCallback>"),
            )
            .finish()
    }
}

impl CleanupConfig {
    /// Create a new builder for `CleanupConfig`.
    pub fn builder() -> CleanupConfigBuilder {
        CleanupConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model name the rewrite call will use.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`CleanupConfig`].
#[derive(Debug)]
pub struct CleanupConfigBuilder {
    config: CleanupConfig,
}

impl CleanupConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: Option<usize>) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn max_chunk_tokens(mut self, n: usize) -> Self {
        self.config.max_chunk_tokens = n;
        self
    }

    pub fn tokenizer_model(mut self, model: impl Into<String>) -> Self {
        self.config.tokenizer_model = model.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn postprocess(mut self, v: bool) -> Self {
        self.config.postprocess = v;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CleanupConfig, MdCleanError> {
        let c = &self.config;
        if c.max_chunk_tokens == 0 {
            return Err(MdCleanError::InvalidConfig(
                "max_chunk_tokens must be ≥ 1".into(),
            ));
        }
        if c.tokenizer_model.trim().is_empty() {
            return Err(MdCleanError::InvalidConfig(
                "tokenizer_model must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(MdCleanError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if matches!(c.max_output_tokens, Some(0)) {
            return Err(MdCleanError::InvalidConfig(
                "max_output_tokens must be ≥ 1 when set".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How to separate pages of an extracted PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Blank line only. (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Separator text placed before page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }

    /// Parse the CLI spelling: `none`, `hr`/`---`, `comment`, or any custom text.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => PageSeparator::None,
            "hr" | "---" => PageSeparator::HorizontalRule,
            "comment" => PageSeparator::Comment,
            _ => PageSeparator::Custom(s.trim().to_string()),
        }
    }
}
