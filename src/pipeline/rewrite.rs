//! Chunk rewriting: send one chunk to the LLM and collect the answer.
//!
//! The rewrite collaborator sits behind [`ChunkRewriter`] so the cleanup
//! pipeline does not care which backend answers. [`LlmRewriter`] is the
//! production implementation on top of `edgequake-llm`; any
//! `Fn(&str) -> Result<String, MdCleanError>` closure also works, which is
//! what the tests use.
//!
//! ## Retry Strategy
//!
//! [`rewrite_chunk`] wraps a single attempt with a timeout and retries with
//! exponential backoff (`retry_backoff_ms * 2^(retry - 1)`, saturating).
//! Every attempt sends the identical chunk text, so a retry is idempotent.

use crate::config::CleanupConfig;
use crate::error::{ChunkError, MdCleanError};
use crate::output::ChunkResult;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Text returned by one successful rewrite call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    /// Prompt tokens billed by the provider, when reported.
    pub input_tokens: usize,
    /// Completion tokens billed by the provider, when reported.
    pub output_tokens: usize,
}

impl Rewritten {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// The external rewriting service: chunk text in, rewritten text out.
///
/// One call is one attempt. Implementations must not keep state between
/// calls that changes the answer for the same input.
pub trait ChunkRewriter: Send + Sync {
    fn rewrite<'a>(&'a self, chunk: &'a str) -> BoxFuture<'a, Result<Rewritten, MdCleanError>>;
}

impl<F> ChunkRewriter for F
where
    F: Fn(&str) -> Result<String, MdCleanError> + Send + Sync,
{
    fn rewrite<'a>(&'a self, chunk: &'a str) -> BoxFuture<'a, Result<Rewritten, MdCleanError>> {
        Box::pin(async move { self(chunk).map(Rewritten::from_text) })
    }
}

/// [`ChunkRewriter`] backed by an `edgequake-llm` chat provider.
///
/// ## Message Layout
/// 1. **System message**: the cleanup rules (or the configured override)
/// 2. **User message**: the chunk text, verbatim
pub struct LlmRewriter {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
}

impl LlmRewriter {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &CleanupConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
        }
    }

    /// Resolve the provider from `config` (see [`resolve_provider`]) and wrap it.
    pub fn from_config(config: &CleanupConfig) -> Result<Self, MdCleanError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }
}

impl fmt::Debug for LlmRewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmRewriter")
            .field("provider", &"<dyn LLMProvider>")
            .field("system_prompt_len", &self.system_prompt.len())
            .field("temperature", &self.options.temperature)
            .field("max_tokens", &self.options.max_tokens)
            .finish()
    }
}

impl ChunkRewriter for LlmRewriter {
    fn rewrite<'a>(&'a self, chunk: &'a str) -> BoxFuture<'a, Result<Rewritten, MdCleanError>> {
        Box::pin(async move {
            let messages = vec![
                ChatMessage::system(self.system_prompt.as_str()),
                ChatMessage::user(chunk),
            ];
            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| MdCleanError::LlmApiError {
                    message: e.to_string(),
                })?;

            if response.content.trim().is_empty() {
                return Err(MdCleanError::EmptyResponse);
            }
            Ok(Rewritten {
                text: response.content,
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
            })
        })
    }
}

/// Delay before retry number `attempt` (1-based). Saturates at `u64::MAX`.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    2u64.checked_pow(attempt.saturating_sub(1))
        .and_then(|m| base_ms.checked_mul(m))
        .unwrap_or(u64::MAX)
}

/// Rewrite one chunk with timeout, retries and backoff.
///
/// `chunk_num` is 1-indexed. Never returns `Err`: a chunk that fails every
/// attempt comes back with [`ChunkResult::error`] set, and the caller decides
/// whether that sinks the document.
pub async fn rewrite_chunk(
    rewriter: &dyn ChunkRewriter,
    chunk_num: usize,
    chunk: &str,
    source_tokens: usize,
    config: &CleanupConfig,
) -> ChunkResult {
    let start = Instant::now();
    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let mut last_err: Option<ChunkError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "Chunk {}: retry {}/{} after {}ms",
                chunk_num, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, rewriter.rewrite(chunk)).await {
            Ok(Ok(rewritten)) => {
                let duration = start.elapsed();
                debug!(
                    "Chunk {}: {} source tokens, {} in / {} out billed, {:?}",
                    chunk_num,
                    source_tokens,
                    rewritten.input_tokens,
                    rewritten.output_tokens,
                    duration
                );
                return ChunkResult {
                    chunk_num,
                    source_tokens,
                    markdown: rewritten.text,
                    input_tokens: rewritten.input_tokens,
                    output_tokens: rewritten.output_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt,
                    error: None,
                };
            }
            Ok(Err(e)) => {
                warn!("Chunk {}: attempt {} failed: {}", chunk_num, attempt + 1, e);
                last_err = Some(ChunkError::RewriteFailed {
                    chunk: chunk_num,
                    retries: config.max_retries,
                    detail: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    "Chunk {}: attempt {} timed out after {}s",
                    chunk_num,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(ChunkError::Timeout {
                    chunk: chunk_num,
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    ChunkResult {
        chunk_num,
        source_tokens,
        markdown: String::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        retries: config.max_retries,
        error: Some(last_err.unwrap_or_else(|| ChunkError::RewriteFailed {
            chunk: chunk_num,
            retries: config.max_retries,
            detail: "Unknown error".to_string(),
        })),
    }
}

/// Build `CompletionOptions` from the cleanup config.
fn build_options(config: &CleanupConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: config.max_output_tokens,
        ..Default::default()
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`crate::config::DEFAULT_MODEL`]; the factory reads the matching API key.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI key** present → `openai` with the configured model.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_provider(config: &CleanupConfig) -> Result<Arc<dyn LLMProvider>, MdCleanError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, config.model.as_deref().unwrap_or(&model));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| MdCleanError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, MdCleanError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        MdCleanError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
