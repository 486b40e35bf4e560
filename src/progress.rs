//! Progress-callback trait for per-chunk cleanup events.
//!
//! Inject an [`Arc<dyn CleanupProgressCallback>`] via
//! [`crate::config::CleanupConfigBuilder::progress_callback`] to receive
//! events while a document's chunks are rewritten. The CLI forwards them to
//! an indicatif progress bar; a server could forward them to a channel.
//!
//! # Example
//!
//! ```rust
//! use edgequake_mdclean::{CleanupConfig, CleanupProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl CleanupProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, chunk_num: usize, total_chunks: usize, markdown_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("chunk {chunk_num}/{total_chunks}: {markdown_len} bytes");
//!     }
//! }
//!
//! let config = CleanupConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by [`crate::clean::Cleaner`] as it rewrites each chunk.
///
/// Chunks are rewritten concurrently, so `on_chunk_*` may be called from
/// several tasks at once and in any order. All methods default to no-ops.
pub trait CleanupProgressCallback: Send + Sync {
    /// Called once per document, after chunking and before any rewrite.
    fn on_document_start(&self, total_chunks: usize, total_tokens: usize) {
        let _ = (total_chunks, total_tokens);
    }

    /// Called just before the rewrite request for a chunk (1-indexed) is sent.
    fn on_chunk_start(&self, chunk_num: usize, total_chunks: usize) {
        let _ = (chunk_num, total_chunks);
    }

    /// Called when a chunk was rewritten; `markdown_len` is in bytes.
    fn on_chunk_complete(&self, chunk_num: usize, total_chunks: usize, markdown_len: usize) {
        let _ = (chunk_num, total_chunks, markdown_len);
    }

    /// Called when a chunk failed after all retries.
    fn on_chunk_error(&self, chunk_num: usize, total_chunks: usize, error: &str) {
        let _ = (chunk_num, total_chunks, error);
    }

    /// Called once after every chunk has been attempted.
    fn on_document_complete(&self, total_chunks: usize, success_count: usize) {
        let _ = (total_chunks, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CleanupProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::CleanupConfig`].
pub type ProgressCallback = Arc<dyn CleanupProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl CleanupProgressCallback for TrackingCallback {
        fn on_document_start(&self, total_chunks: usize, _total_tokens: usize) {
            self.started_total.store(total_chunks, Ordering::SeqCst);
        }

        fn on_chunk_start(&self, _chunk_num: usize, _total_chunks: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _chunk_num: usize, _total_chunks: usize, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_error(&self, _chunk_num: usize, _total_chunks: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _total_chunks: usize, success_count: usize) {
            self.succeeded.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_start(3, 20_000);
        cb.on_chunk_start(1, 3);
        cb.on_chunk_complete(1, 3, 42);
        cb.on_chunk_error(2, 3, "timeout");
        cb.on_document_complete(3, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = TrackingCallback::default();
        t.on_document_start(2, 100);
        t.on_chunk_start(1, 2);
        t.on_chunk_complete(1, 2, 10);
        t.on_chunk_start(2, 2);
        t.on_chunk_error(2, 2, "HTTP 500");
        t.on_document_complete(2, 1);

        assert_eq!(t.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(t.starts.load(Ordering::SeqCst), 2);
        assert_eq!(t.completes.load(Ordering::SeqCst), 1);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(t.succeeded.load(Ordering::SeqCst), 1);
    }
}
