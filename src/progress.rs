//! Progress-callback trait for per-item batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::EngineConfigBuilder::progress_callback`] to receive
//! events while a handler walks its documents or videos. The trait is
//! `Send + Sync` because document batches run on a blocking worker thread.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docflow::{BatchProgressCallback, EngineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, name: &str) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} done: {}", index, total, name);
//!     }
//! }
//!
//! let config = EngineConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by handlers as they process each item of a batch.
///
/// All methods have default no-op implementations. Indices are 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first item.
    fn on_batch_start(&self, operation: &str, total: usize) {
        let _ = (operation, total);
    }

    /// Called before an item is processed.
    fn on_item_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an item produced output (or a "no match" notice).
    fn on_item_complete(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an item failed.
    fn on_item_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after every item has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopBatchProgress;

impl BatchProgressCallback for NoopBatchProgress {}

/// Convenience alias matching the type stored in [`crate::config::EngineConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        success_total: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_item_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _index: usize, _total: usize, _name: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.success_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopBatchProgress;
        cb.on_batch_start("watermark", 2);
        cb.on_item_start(1, 2, "a.pdf");
        cb.on_item_complete(1, 2, "a.pdf");
        cb.on_item_error(2, 2, "b.pdf", "corrupt");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            success_total: AtomicUsize::new(0),
        };

        tracker.on_item_start(1, 3, "a.mp4");
        tracker.on_item_complete(1, 3, "a.mp4");
        tracker.on_item_start(2, 3, "b.mp4");
        tracker.on_item_error(2, 3, "b.mp4", "ffmpeg exited 1");
        tracker.on_item_start(3, 3, "c.mp4");
        tracker.on_item_complete(3, 3, "c.mp4");
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.success_total.load(Ordering::SeqCst), 2);
    }
}
