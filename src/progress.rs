//! Progress-callback trait for per-paragraph extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the document. The CLI uses it to
//! drive its progress bar; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use regrules::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FallbackCounter(AtomicUsize);
//!
//! impl ExtractionProgressCallback for FallbackCounter {
//!     fn on_paragraph_fallback(&self, page: u32, index: usize, error: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{page}_{index} fell back: {error}");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(FallbackCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it processes each paragraph.
///
/// All methods have default no-op implementations. With
/// `concurrency > 1` the per-paragraph methods may be called from
/// interleaved futures, so shared state needs synchronisation.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after the document has been read and split.
    fn on_extraction_start(&self, total_pages: usize, total_paragraphs: usize) {
        let _ = (total_pages, total_paragraphs);
    }

    /// Called before the first model call for a paragraph.
    fn on_paragraph_start(&self, page: u32, index: usize) {
        let _ = (page, index);
    }

    /// Called when the model produced a usable fragment.
    fn on_paragraph_complete(&self, page: u32, index: usize, attempts: u32) {
        let _ = (page, index, attempts);
    }

    /// Called when every attempt failed and the fallback fragment was used.
    fn on_paragraph_fallback(&self, page: u32, index: usize, error: &str) {
        let _ = (page, index, error);
    }

    /// Called once after all paragraphs have been handled.
    fn on_extraction_complete(&self, total_rules: usize, fallback_rules: usize) {
        let _ = (total_rules, fallback_rules);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        fallbacks: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_paragraph_start(&self, _page: u32, _index: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_paragraph_complete(&self, _page: u32, _index: usize, _attempts: u32) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_paragraph_fallback(&self, _page: u32, _index: usize, _error: &str) {
            self.fallbacks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(2, 5);
        cb.on_paragraph_start(1, 0);
        cb.on_paragraph_complete(1, 0, 1);
        cb.on_paragraph_fallback(1, 1, "timeout");
        cb.on_extraction_complete(5, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_paragraph_start(1, 0);
        tracker.on_paragraph_complete(1, 0, 1);
        tracker.on_paragraph_start(1, 1);
        tracker.on_paragraph_fallback(1, 1, "malformed");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.fallbacks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_extraction_start(1, 1);
    }
}
